// Verification Result Domain Model

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use super::target::VerificationTarget;

/// Number of stderr lines folded into the message of a failed run
const MESSAGE_STDERR_LINES: usize = 2;

/// How a verification ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Exited on its own with code 0
    Completed,
    /// Announced readiness and exited after a graceful stop request
    GracefullyStopped,
    /// Exited on its own with a non-zero code
    NonZeroExit,
    /// Neither exited nor announced readiness before the deadline
    TimedOut,
    /// Announced readiness but ignored the graceful stop request
    StopFailed,
    /// Could not be verified at all (spawn failure, I/O error, panic)
    Error,
}

impl VerificationStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Completed | VerificationStatus::GracefullyStopped
        )
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Completed => write!(f, "COMPLETED"),
            VerificationStatus::GracefullyStopped => write!(f, "GRACEFULLY_STOPPED"),
            VerificationStatus::NonZeroExit => write!(f, "NON_ZERO_EXIT"),
            VerificationStatus::TimedOut => write!(f, "TIMED_OUT"),
            VerificationStatus::StopFailed => write!(f, "STOP_FAILED"),
            VerificationStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Lines captured from a target's stdout and stderr
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CapturedOutput {
    pub fn new(stdout: Vec<String>, stderr: Vec<String>) -> Self {
        Self { stdout, stderr }
    }
}

/// Outcome of verifying one target
///
/// Created exactly once per target by the process verifier and never mutated
/// after it is handed to the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub name: String,
    pub path: PathBuf,
    pub status: VerificationStatus,
    pub success: bool,
    /// None when the process was killed or never started
    pub exit_code: Option<i32>,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub message: String,
    pub stdout: String,
    pub stderr: String,
    /// Succeeded, but wrote to stderr anyway
    pub stderr_on_success: bool,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
}

impl VerificationResult {
    fn build(
        target: &VerificationTarget,
        status: VerificationStatus,
        exit_code: Option<i32>,
        message: impl Into<String>,
        output: CapturedOutput,
    ) -> Self {
        let success = status.is_success();
        Self {
            name: target.name.clone(),
            path: target.path.clone(),
            status,
            success,
            exit_code,
            duration: Duration::ZERO,
            message: message.into(),
            stdout: output.stdout.join("\n"),
            stderr_on_success: success && !output.stderr.is_empty(),
            stderr: output.stderr.join("\n"),
            pid: None,
            started_at: Utc::now(),
        }
    }

    /// Process exited on its own
    pub fn exited(target: &VerificationTarget, exit_code: Option<i32>, output: CapturedOutput) -> Self {
        if exit_code == Some(0) {
            return Self::build(
                target,
                VerificationStatus::Completed,
                exit_code,
                "Process completed successfully",
                output,
            );
        }

        let message = if output.stderr.is_empty() {
            match exit_code {
                Some(code) => format!("Exit code: {}", code),
                None => "Exit code: terminated by signal".to_string(),
            }
        } else {
            output
                .stderr
                .iter()
                .take(MESSAGE_STDERR_LINES)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        };

        Self::build(target, VerificationStatus::NonZeroExit, exit_code, message, output)
    }

    /// Ready sentinel seen, graceful stop honoured
    pub fn gracefully_stopped(target: &VerificationTarget, output: CapturedOutput) -> Self {
        Self::build(
            target,
            VerificationStatus::GracefullyStopped,
            Some(0),
            "App started & stopped successfully",
            output,
        )
    }

    /// Ready sentinel seen, graceful stop ignored, process killed
    pub fn stop_failed(target: &VerificationTarget, output: CapturedOutput) -> Self {
        Self::build(
            target,
            VerificationStatus::StopFailed,
            None,
            "App failed to gracefully stop",
            output,
        )
    }

    /// Outer deadline elapsed, process killed
    pub fn timed_out(target: &VerificationTarget, timeout: Duration, output: CapturedOutput) -> Self {
        Self::build(
            target,
            VerificationStatus::TimedOut,
            None,
            format!("Timeout ({}s)", timeout.as_secs_f64()),
            output,
        )
    }

    /// Verification could not be carried out
    pub fn error(target: &VerificationTarget, error: impl std::fmt::Display, output: CapturedOutput) -> Self {
        Self::build(
            target,
            VerificationStatus::Error,
            None,
            format!("Error: {}", error),
            output,
        )
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>, duration: Duration) -> Self {
        self.started_at = started_at;
        self.duration = duration;
        self
    }

    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// All results of one run, one per submitted target
///
/// Insertion order follows completion order, not target order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<VerificationResult>,
}

impl ResultSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, result: VerificationResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter()
    }

    /// Most recently recorded result
    pub fn last(&self) -> Option<&VerificationResult> {
        self.results.last()
    }

    /// Results ordered by display name, then path
    pub fn sorted_by_name(&self) -> Vec<&VerificationResult> {
        let mut sorted: Vec<&VerificationResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        sorted
    }

    pub fn outcome(&self) -> RunOutcome {
        let passed = self.results.iter().filter(|r| r.success).count();
        RunOutcome {
            total: self.results.len(),
            passed,
            failed: self.results.len() - passed,
        }
    }

    pub fn into_vec(self) -> Vec<VerificationResult> {
        self.results
    }
}

impl From<Vec<VerificationResult>> for ResultSet {
    fn from(results: Vec<VerificationResult>) -> Self {
        Self { results }
    }
}

impl FromIterator<VerificationResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = VerificationResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Summary counts derived from a ResultSet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunOutcome {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for the whole run
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}
