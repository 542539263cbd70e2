// Shutdown Signaler Port
// Platform-specific graceful termination of a running target

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Outcome of a graceful stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Process exited (or had already exited) within the timeout
    StoppedInTime,
    /// Process was still running when the timeout elapsed
    TimedOut,
}

/// Shutdown Signaler trait
///
/// Implementations:
/// - UnixInterruptSignaler: SIGINT to the process id
/// - WindowsCtrlBreakSignaler: CTRL_BREAK_EVENT to the process group
///
/// A signaler never force-kills. On `TimedOut` the caller owns the kill.
#[async_trait]
pub trait ShutdownSignaler: Send + Sync {
    /// Adjust the spawn command so the process can receive the stop request later
    ///
    /// Called once per target before spawning. Default: no changes.
    fn prepare_command(&self, _command: &mut Command) {}

    /// Ask the process to stop and wait up to `timeout` for it to exit
    ///
    /// Must not fail on a process that already exited: that is `StoppedInTime`.
    async fn request_graceful_stop(&self, child: &mut Child, timeout: Duration) -> StopOutcome;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock signaler behavior
    #[derive(Debug, Clone, Copy)]
    pub enum MockStopBehavior {
        /// Kill the process and report it stopped in time
        Comply,
        /// Send nothing and report a timeout
        Ignore,
    }

    /// Mock Shutdown Signaler for testing
    pub struct MockShutdownSignaler {
        behavior: MockStopBehavior,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockShutdownSignaler {
        pub fn new(behavior: MockStopBehavior) -> Self {
            Self {
                behavior,
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn complying() -> Self {
            Self::new(MockStopBehavior::Comply)
        }
        pub fn ignoring() -> Self {
            Self::new(MockStopBehavior::Ignore)
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ShutdownSignaler for MockShutdownSignaler {
        async fn request_graceful_stop(&self, child: &mut Child, timeout: Duration) -> StopOutcome {
            *self.call_count.lock().unwrap() += 1;

            match self.behavior {
                MockStopBehavior::Comply => {
                    let _ = child.start_kill();
                    match tokio::time::timeout(timeout, child.wait()).await {
                        Ok(_) => StopOutcome::StoppedInTime,
                        Err(_) => StopOutcome::TimedOut,
                    }
                }
                MockStopBehavior::Ignore => {
                    tokio::time::sleep(timeout).await;
                    StopOutcome::TimedOut
                }
            }
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }
}
