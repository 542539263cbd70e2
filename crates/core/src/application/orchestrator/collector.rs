// Result collection shared by all verifications of one run
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{ResultSet, VerificationResult};
use crate::port::ProgressObserver;

/// Accumulates results and drives progress reporting
///
/// `record` is the single append-and-report step. In concurrent mode the
/// collector sits behind one mutex so that step is atomic.
pub(crate) struct ResultCollector {
    results: ResultSet,
    total: usize,
    observer: Arc<dyn ProgressObserver>,
}

impl ResultCollector {
    pub(crate) fn new(total: usize, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            results: ResultSet::with_capacity(total),
            total,
            observer,
        }
    }

    pub(crate) fn record(&mut self, result: VerificationResult) {
        // Store first: an observer panic must not lose the result
        self.results.push(result);
        let completed = self.results.len();
        if let Some(latest) = self.results.last() {
            self.observer.on_result(completed, self.total, latest);
        }
    }

    pub(crate) fn into_results(self) -> ResultSet {
        self.results
    }

    pub(crate) fn take_results(&mut self) -> ResultSet {
        std::mem::take(&mut self.results)
    }
}

/// Lock that survives a poisoned mutex (a panicking observer)
pub(crate) fn lock(collector: &Mutex<ResultCollector>) -> MutexGuard<'_, ResultCollector> {
    collector.lock().unwrap_or_else(PoisonError::into_inner)
}
