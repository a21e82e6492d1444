//! `laserbot-middleware` – inter-stage plumbing.
//!
//! Moves values between pipeline stages without caring what they mean.
//!
//! # Modules
//!
//! - [`mailbox`] – [`Mailbox`][mailbox::Mailbox]: a single-slot,
//!   latest-value-wins handoff between exactly one producer stage and one
//!   consumer stage.  Used for detected points (sensing → decision) and
//!   movement commands (decision → actuation).

pub mod mailbox;

pub use mailbox::Mailbox;
