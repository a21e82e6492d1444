//! [`Mailbox`] – single-slot, latest-value-wins handoff.
//!
//! A mailbox holds at most one pending value.  [`Mailbox::publish`]
//! overwrites whatever is there; [`Mailbox::take`] removes the value so it
//! is consumed at most once.  A slow or skipped reader silently loses the
//! intermediate values: a real-time control loop cares about the freshest
//! sample, not about every sample.
//!
//! Each mailbox is meant to be shared (behind an [`Arc`][std::sync::Arc])
//! between exactly one producer stage and one consumer stage.
//!
//! # Example
//!
//! ```
//! use laserbot_middleware::Mailbox;
//!
//! let mailbox = Mailbox::new("points");
//! mailbox.publish(1);
//! mailbox.publish(2);
//!
//! assert_eq!(mailbox.take(), Some(2));
//! assert_eq!(mailbox.take(), None);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Single-slot overwrite-on-write, take-on-read container.
#[derive(Debug)]
pub struct Mailbox<T> {
    name: &'static str,
    slot: Mutex<Option<T>>,
    /// Mirrors `slot.is_some()`; lets readers skip the lock when empty.
    available: AtomicBool,
}

impl<T> Mailbox<T> {
    /// Create an empty mailbox.  `name` only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
            available: AtomicBool::new(false),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Store `value`, replacing any unread value.
    pub fn publish(&self, value: T) {
        let mut slot = self.lock();
        if slot.replace(value).is_some() {
            trace!(mailbox = self.name, "unread value superseded");
        }
        self.available.store(true, Ordering::Release);
    }

    /// Remove and return the pending value, if any.
    pub fn take(&self) -> Option<T> {
        if !self.available.load(Ordering::Acquire) {
            return None;
        }
        let mut slot = self.lock();
        self.available.store(false, Ordering::Release);
        slot.take()
    }

    /// `true` when a value is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    // A panic while holding the lock cannot leave the slot half-written, so
    // a poisoned mutex is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_mailbox_yields_nothing() {
        let mailbox: Mailbox<u32> = Mailbox::new("empty");
        assert!(!mailbox.is_pending());
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn latest_value_wins() {
        let mailbox = Mailbox::new("points");
        mailbox.publish("v1");
        mailbox.publish("v2");
        assert_eq!(mailbox.take(), Some("v2"));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn take_clears_presence() {
        let mailbox = Mailbox::new("commands");
        mailbox.publish(7);
        assert!(mailbox.is_pending());
        mailbox.take();
        assert!(!mailbox.is_pending());
    }

    #[test]
    fn publish_after_take_is_visible_again() {
        let mailbox = Mailbox::new("commands");
        mailbox.publish(1);
        assert_eq!(mailbox.take(), Some(1));
        mailbox.publish(2);
        assert_eq!(mailbox.take(), Some(2));
    }

    #[test]
    fn values_are_moved_not_cloned() {
        // `String` is not `Copy`; ownership moves in and back out.
        let mailbox = Mailbox::new("owned");
        mailbox.publish(String::from("frame-42"));
        let taken: String = mailbox.take().unwrap();
        assert_eq!(taken, "frame-42");
    }

    #[test]
    fn concurrent_reader_never_sees_a_value_twice() {
        const COUNT: u32 = 20_000;
        let mailbox = Arc::new(Mailbox::new("stress"));

        let producer = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                for i in 1..=COUNT {
                    mailbox.publish(i);
                }
            })
        };

        let consumer = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                let mut seen = Vec::new();
                loop {
                    if let Some(v) = mailbox.take() {
                        seen.push(v);
                        if v == COUNT {
                            break;
                        }
                    }
                }
                seen
            })
        };

        producer.join().unwrap();
        let seen = consumer.join().unwrap();

        // Strictly increasing: no duplicates and no stale value after a newer one.
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "values must be strictly increasing");
        assert_eq!(*seen.last().unwrap(), COUNT);
        assert_eq!(mailbox.take(), None);
    }
}
