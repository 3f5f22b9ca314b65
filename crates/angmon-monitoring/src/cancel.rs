use angmon_core::{AngmonError, AngmonResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop signal for a monitoring run. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the run has been cancelled.
    pub fn check(&self, context: &str) -> AngmonResult<()> {
        if self.is_cancelled() {
            Err(AngmonError::Cancelled(context.to_string()))
        } else {
            Ok(())
        }
    }
}
