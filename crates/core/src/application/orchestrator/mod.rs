// Batch Orchestrator - runs the verifier over every target

mod collector;
mod panic_guard;

pub use panic_guard::{panic_message, verify_guarded};

use collector::{lock, ResultCollector};

use crate::domain::{ResultSet, VerificationTarget};
use crate::port::{NoopProgress, ProcessVerifier, ProgressObserver};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info};

/// How a batch is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One target at a time, in input order
    Sequential,
    /// Every target at once, no concurrency cap
    Concurrent,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "Sequential"),
            ExecutionMode::Concurrent => write!(f, "Parallel"),
        }
    }
}

/// Runs a batch of verifications and collects exactly one result per target
pub struct BatchOrchestrator {
    verifier: Arc<dyn ProcessVerifier>,
    observer: Arc<dyn ProgressObserver>,
}

impl BatchOrchestrator {
    /// Create an orchestrator without progress reporting
    pub fn new(verifier: Arc<dyn ProcessVerifier>) -> Self {
        Self {
            verifier,
            observer: Arc::new(NoopProgress),
        }
    }

    /// Attach a progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Verify every target and return the full result set
    ///
    /// # Arguments
    /// * `targets` - Programs to verify
    /// * `mode` - Sequential or concurrent scheduling
    /// * `timeout` - Per-target deadline (each target has its own clock)
    ///
    /// The returned set always holds `targets.len()` results, whatever the
    /// individual outcomes (including panics inside a verification).
    pub async fn run_all(
        &self,
        targets: Vec<VerificationTarget>,
        mode: ExecutionMode,
        timeout: Duration,
    ) -> ResultSet {
        let total = targets.len();
        info!(total = total, mode = %mode, timeout_secs = timeout.as_secs_f64(), "Starting batch");
        self.observer.on_start(total);

        let results = match mode {
            ExecutionMode::Sequential => self.run_sequential(targets, timeout).await,
            ExecutionMode::Concurrent => self.run_concurrent(targets, timeout).await,
        };

        let outcome = results.outcome();
        if results.len() != total {
            error!(expected = total, actual = results.len(), "Result count mismatch");
        }
        info!(
            total = outcome.total,
            passed = outcome.passed,
            failed = outcome.failed,
            "Batch finished"
        );

        results
    }

    async fn run_sequential(&self, targets: Vec<VerificationTarget>, timeout: Duration) -> ResultSet {
        let mut collector = ResultCollector::new(targets.len(), Arc::clone(&self.observer));

        for target in targets {
            let result = verify_guarded(Arc::clone(&self.verifier), target, timeout).await;
            collector.record(result);
        }

        collector.into_results()
    }

    async fn run_concurrent(&self, targets: Vec<VerificationTarget>, timeout: Duration) -> ResultSet {
        let collector = Arc::new(Mutex::new(ResultCollector::new(
            targets.len(),
            Arc::clone(&self.observer),
        )));

        let mut tasks = JoinSet::new();
        for target in targets {
            let verifier = Arc::clone(&self.verifier);
            let collector = Arc::clone(&collector);

            tasks.spawn(async move {
                let result = verify_guarded(verifier, target, timeout).await;
                lock(&collector).record(result);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(join_err) = joined {
                // Only reachable if the observer panicked after the result was stored
                error!(error = ?join_err, "Result collection task failed");
            }
        }

        let results = lock(&collector).take_results();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{VerificationResult, VerificationStatus};
    use crate::port::process_verifier::mocks::{MockBehavior, MockProcessVerifier};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::time::Instant;

    /// Records every progress callback
    struct RecordingProgress {
        calls: Mutex<Vec<(usize, usize, String)>>,
        started_with: Mutex<Option<usize>>,
    }

    impl RecordingProgress {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                started_with: Mutex::new(None),
            }
        }
    }

    impl ProgressObserver for RecordingProgress {
        fn on_start(&self, total: usize) {
            *self.started_with.lock().unwrap() = Some(total);
        }

        fn on_result(&self, completed: usize, total: usize, latest: &VerificationResult) {
            self.calls
                .lock()
                .unwrap()
                .push((completed, total, latest.name.clone()));
        }
    }

    fn targets(count: usize) -> Vec<VerificationTarget> {
        (0..count)
            .map(|i| VerificationTarget::for_file(format!("/apps/app{i}/app{i}.cs"), "dotnet", false))
            .collect()
    }

    fn distinct_paths(results: &ResultSet) -> HashSet<PathBuf> {
        results.iter().map(|r| r.path.clone()).collect()
    }

    #[tokio::test]
    async fn test_sequential_one_result_per_target_in_order() {
        let verifier = Arc::new(MockProcessVerifier::new_pass());
        let orchestrator = BatchOrchestrator::new(verifier.clone());

        let input = targets(5);
        let results = orchestrator
            .run_all(input.clone(), ExecutionMode::Sequential, Duration::from_secs(1))
            .await;

        assert_eq!(results.len(), 5);
        assert_eq!(verifier.call_count(), 5);
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        let expected: Vec<&str> = input.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_concurrent_one_result_per_target() {
        let verifier = Arc::new(MockProcessVerifier::new_delay(20));
        let orchestrator = BatchOrchestrator::new(verifier.clone());

        let results = orchestrator
            .run_all(targets(25), ExecutionMode::Concurrent, Duration::from_secs(1))
            .await;

        assert_eq!(results.len(), 25);
        assert_eq!(distinct_paths(&results).len(), 25);
        assert_eq!(verifier.call_count(), 25);
        assert!(results.outcome().all_passed());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = BatchOrchestrator::new(Arc::new(MockProcessVerifier::new_pass()));

        for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
            let results = orchestrator.run_all(vec![], mode, Duration::from_secs(1)).await;
            assert!(results.is_empty());
            assert_eq!(results.outcome().exit_code(), 0);
        }
    }

    #[tokio::test]
    async fn test_panic_in_one_verification_does_not_abort_batch() {
        for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
            let verifier = Arc::new(
                MockProcessVerifier::new_pass()
                    .with_override("app1.cs", MockBehavior::Panic("boom".to_string()))
                    .with_override("app3.cs", MockBehavior::Fail(3)),
            );
            let orchestrator = BatchOrchestrator::new(verifier);

            let results = orchestrator
                .run_all(targets(5), mode, Duration::from_secs(1))
                .await;

            assert_eq!(results.len(), 5, "mode {mode}");
            assert_eq!(distinct_paths(&results).len(), 5);

            let outcome = results.outcome();
            assert_eq!(outcome.passed, 3);
            assert_eq!(outcome.failed, 2);

            let panicked = results.iter().find(|r| r.name == "app1.cs").unwrap();
            assert_eq!(panicked.status, VerificationStatus::Error);
            assert!(panicked.message.contains("boom"));

            let failed = results.iter().find(|r| r.name == "app3.cs").unwrap();
            assert_eq!(failed.exit_code, Some(3));
        }
    }

    #[tokio::test]
    async fn test_progress_reported_once_per_target() {
        for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
            let progress = Arc::new(RecordingProgress::new());
            let orchestrator = BatchOrchestrator::new(Arc::new(MockProcessVerifier::new_delay(5)))
                .with_observer(progress.clone());

            orchestrator
                .run_all(targets(8), mode, Duration::from_secs(1))
                .await;

            assert_eq!(*progress.started_with.lock().unwrap(), Some(8));
            let calls = progress.calls.lock().unwrap();
            assert_eq!(calls.len(), 8);
            for (i, (completed, total, _)) in calls.iter().enumerate() {
                assert_eq!(*completed, i + 1);
                assert_eq!(*total, 8);
            }
            let names: HashSet<&String> = calls.iter().map(|(_, _, n)| n).collect();
            assert_eq!(names.len(), 8);
        }
    }

    #[tokio::test]
    async fn test_concurrent_mode_runs_in_parallel() {
        let orchestrator = BatchOrchestrator::new(Arc::new(MockProcessVerifier::new_delay(300)));

        let start = Instant::now();
        let results = orchestrator
            .run_all(targets(10), ExecutionMode::Concurrent, Duration::from_secs(5))
            .await;
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 10);
        // Sequential would take ~3s
        assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
    }
}
