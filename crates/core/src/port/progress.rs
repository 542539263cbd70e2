// Progress Observer Port
// Side channel for interactive progress display

use crate::domain::VerificationResult;

/// Observer notified as verifications complete
///
/// Calls for one run are serialized by the orchestrator, so implementations
/// do not need their own locking to keep counts consistent.
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first verification starts
    fn on_start(&self, _total: usize) {}

    /// Called after each target completes
    fn on_result(&self, completed: usize, total: usize, latest: &VerificationResult);
}

/// Observer for non-interactive callers
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_result(&self, _completed: usize, _total: usize, _latest: &VerificationResult) {}
}
