//! [`Stage`] – one periodic unit of pipeline work – and [`Subsystem`], the
//! lazily initialised hardware handle a stage owns.

use laserbot_types::BotError;
use tracing::error;

/// One step of a pipeline stage.  The sequencer calls
/// [`run_once`][Stage::run_once] once per period.
pub trait Stage: Send {
    fn name(&self) -> &str;

    /// Do one period of work.  Failures are handled (logged, skipped)
    /// inside the stage; they surface to the supervisor only as a missing
    /// liveness report.
    fn run_once(&mut self);

    /// Called once after the last period, before the stage is dropped.
    fn shutdown(&mut self) {}
}

type InitFn<T> = Box<dyn FnOnce() -> Result<T, BotError> + Send>;

enum State<T> {
    Uninit(InitFn<T>),
    Ready(T),
    Failed,
}

/// A hardware handle that is opened on first use.
///
/// If the initialiser fails, the error is logged once and every later
/// [`get`][Subsystem::get] returns `None`.  There is no retry: the owning
/// stage stops reporting liveness and the watchdog eventually resets the
/// device.
pub struct Subsystem<T> {
    name: String,
    state: State<T>,
}

impl<T> Subsystem<T> {
    pub fn new(
        name: impl Into<String>,
        init: impl FnOnce() -> Result<T, BotError> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            state: State::Uninit(Box::new(init)),
        }
    }

    /// A subsystem that is already initialised.
    pub fn ready(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            state: State::Ready(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The initialised handle, running the initialiser on first call.
    pub fn get(&mut self) -> Option<&mut T> {
        if matches!(self.state, State::Uninit(_)) {
            let State::Uninit(init) = std::mem::replace(&mut self.state, State::Failed) else {
                return None;
            };
            match init() {
                Ok(value) => self.state = State::Ready(value),
                Err(e) => {
                    error!(subsystem = %self.name, error = %e, "initialisation failed; subsystem disabled");
                }
            }
        }
        match &mut self.state {
            State::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The handle if it is already initialised.  Never runs the initialiser.
    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            State::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }
}

impl<T> std::fmt::Debug for Subsystem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Uninit(_) => "uninit",
            State::Ready(_) => "ready",
            State::Failed => "failed",
        };
        f.debug_struct("Subsystem")
            .field("name", &self.name)
            .field("state", &state)
            .finish()
    }
}
