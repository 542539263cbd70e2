// Process Verifier Port
// Abstraction for verifying one target (subprocess in production, mock in tests)

use crate::domain::{CapturedOutput, VerificationResult, VerificationTarget};
use async_trait::async_trait;
use std::time::Duration;

/// Process Verifier trait
///
/// Implementations:
/// - SubprocessVerifier: spawns the target and races exit / ready / timeout
/// - MockProcessVerifier: scripted results for orchestrator tests
#[async_trait]
pub trait ProcessVerifier: Send + Sync {
    /// Verify a single target
    ///
    /// Never fails: spawn errors, I/O errors and timeouts are all recorded in
    /// the returned result.
    async fn verify(&self, target: &VerificationTarget, timeout: Duration) -> VerificationResult;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Mock verifier behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit code 0
        Pass,
        /// Exit with the given non-zero code
        Fail(i32),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Exit code 0 after sleeping N ms
        Delay(u64),
    }

    /// Mock Process Verifier for testing
    ///
    /// Behavior is chosen per target name, falling back to a default.
    pub struct MockProcessVerifier {
        default_behavior: MockBehavior,
        overrides: Arc<Mutex<HashMap<String, MockBehavior>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockProcessVerifier {
        pub fn new(default_behavior: MockBehavior) -> Self {
            Self {
                default_behavior,
                overrides: Arc::new(Mutex::new(HashMap::new())),
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn new_pass() -> Self {
            Self::new(MockBehavior::Pass)
        }
        pub fn new_delay(ms: u64) -> Self {
            Self::new(MockBehavior::Delay(ms))
        }
        pub fn with_override(self, name: impl Into<String>, behavior: MockBehavior) -> Self {
            self.overrides.lock().unwrap().insert(name.into(), behavior);
            self
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ProcessVerifier for MockProcessVerifier {
        async fn verify(&self, target: &VerificationTarget, _timeout: Duration) -> VerificationResult {
            *self.call_count.lock().unwrap() += 1;

            let behavior = self
                .overrides
                .lock()
                .unwrap()
                .get(&target.name)
                .cloned()
                .unwrap_or_else(|| self.default_behavior.clone());

            let output = CapturedOutput::new(vec!["mock output".to_string()], vec![]);
            match behavior {
                MockBehavior::Pass => VerificationResult::exited(target, Some(0), output),
                MockBehavior::Fail(code) => VerificationResult::exited(target, Some(code), output),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Delay(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    VerificationResult::exited(target, Some(0), output)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{MockBehavior, MockProcessVerifier};
    use super::*;
    use crate::domain::{LaunchSpec, VerificationStatus};

    fn target(name: &str) -> VerificationTarget {
        VerificationTarget::new(format!("/apps/{name}"), LaunchSpec::new("dotnet", "/apps"))
    }

    #[test]
    fn test_mock_overrides_by_name() {
        let verifier = MockProcessVerifier::new_pass().with_override("bad.cs", MockBehavior::Fail(4));

        let ok = tokio_test::block_on(verifier.verify(&target("good.cs"), Duration::from_secs(1)));
        let bad = tokio_test::block_on(verifier.verify(&target("bad.cs"), Duration::from_secs(1)));

        assert_eq!(ok.status, VerificationStatus::Completed);
        assert_eq!(bad.status, VerificationStatus::NonZeroExit);
        assert_eq!(bad.exit_code, Some(4));
        assert_eq!(verifier.call_count(), 2);
    }
}
