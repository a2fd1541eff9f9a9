//! Operator interruption.
//!
//! While the pipeline runs, the Ctrl-C handler only raises a flag. The running
//! child receives the same signal and exits, its stage fails, and the pipeline
//! reports the run as interrupted after releasing the transient script. Once
//! the run is marked finished, a further Ctrl-C terminates the process.

use crate::error::{PipelineError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status used when the operator interrupts a finished run.
pub const INTERRUPTED_EXIT_CODE: i32 = 1;

#[derive(Debug, Default)]
struct FlagState {
    raised: AtomicBool,
    finished: AtomicBool,
}

/// Shared flag raised when the operator interrupts the run.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<FlagState>);

impl InterruptFlag {
    /// Create a lowered flag that no signal handler is attached to.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag raised by Ctrl-C (and SIGTERM on Unix).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the handler cannot be installed, for example
    /// because another handler is already registered.
    pub fn install() -> Result<Self> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            if handler_flag.on_signal() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
        .map_err(|e| {
            PipelineError::Io(std::io::Error::other(format!(
                "failed to install interrupt handler: {e}"
            )))
        })?;
        Ok(flag)
    }

    /// Mark the run as interrupted.
    pub fn raise(&self) {
        self.0.raised.store(true, Ordering::SeqCst);
    }

    /// Returns true once the run has been interrupted.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.raised.load(Ordering::SeqCst)
    }

    /// Mark the pipeline as returned; later signals end the process.
    pub fn finish(&self) {
        self.0.finished.store(true, Ordering::SeqCst);
    }

    /// Returns true once the pipeline has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.0.finished.load(Ordering::SeqCst)
    }

    /// Record a signal. Returns true when the process should exit now.
    fn on_signal(&self) -> bool {
        self.raise();
        self.is_finished()
    }
}
