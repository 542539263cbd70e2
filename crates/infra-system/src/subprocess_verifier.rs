// Subprocess verifier implementation
// reason: async-trait, tokio for async process management and the exit/ready/timeout race
use async_trait::async_trait;
use chrono::Utc;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use appverify_core::application::constants::{
    GRACEFUL_STOP_TIMEOUT, OUTPUT_DRAIN_TIMEOUT, READY_SENTINEL,
};
use appverify_core::domain::{CapturedOutput, LaunchSpec, VerificationResult, VerificationTarget};
use appverify_core::port::{ProcessVerifier, ShutdownSignaler, StopOutcome};

use crate::output_buffer::{pump_lines, OutputBuffer, ReadyLatch};

/// Verifier settings
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Stdout substring announcing readiness for a graceful stop
    pub sentinel: String,
    /// How long a target gets to exit after the stop request
    pub graceful_stop_timeout: Duration,
    /// Upper bound on collecting remaining output after the race
    pub drain_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            sentinel: READY_SENTINEL.to_string(),
            graceful_stop_timeout: GRACEFUL_STOP_TIMEOUT,
            drain_timeout: OUTPUT_DRAIN_TIMEOUT,
        }
    }
}

/// Subprocess verifier
/// Spawns the target and races natural exit, the ready sentinel and the timeout
pub struct SubprocessVerifier {
    signaler: Arc<dyn ShutdownSignaler>,
    config: VerifierConfig,
}

/// First event of the race
enum Race {
    Exited(std::io::Result<ExitStatus>),
    Ready,
    TimedOut,
}

/// How the race was settled, before output is attached
enum Verdict {
    Exited(Option<i32>),
    Stopped,
    StopFailed,
    TimedOut,
    WaitFailed(std::io::Error),
}

/// A spawned target plus its output readers
///
/// Dropping it kills the process if still running and aborts the readers, so
/// cleanup happens on every exit path, panics included.
struct RunningProcess {
    child: Child,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    readers: Vec<JoinHandle<()>>,
}

impl RunningProcess {
    fn attach(mut child: Child, sentinel: &str) -> (Self, oneshot::Receiver<()>) {
        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        let (latch, ready_rx) = ReadyLatch::new(sentinel);
        let mut readers = Vec::with_capacity(2);

        if let Some(out) = child.stdout.take() {
            readers.push(tokio::spawn(pump_lines(out, stdout.clone(), Some(latch))));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(tokio::spawn(pump_lines(err, stderr.clone(), None)));
        }

        let process = Self {
            child,
            stdout,
            stderr,
            readers,
        };
        (process, ready_rx)
    }

    /// Force kill, best-effort; an already-exited process is a no-op
    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "Kill failed (process likely already gone)");
        }
    }

    /// Let the readers reach EOF (bounded), then snapshot both buffers
    async fn drain(&mut self, timeout: Duration) -> CapturedOutput {
        let readers = &mut self.readers;
        let drained = tokio::time::timeout(timeout, async move {
            for reader in readers.iter_mut() {
                let _ = reader.await;
            }
        })
        .await;

        if drained.is_err() {
            // e.g. a grandchild still holds the pipe open
            debug!("Output readers did not finish in time, keeping partial output");
            for reader in &self.readers {
                reader.abort();
            }
        }
        self.readers.clear();

        CapturedOutput::new(self.stdout.snapshot(), self.stderr.snapshot())
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        if !matches!(self.child.try_wait(), Ok(Some(_))) {
            let _ = self.child.start_kill();
        }
        for reader in &self.readers {
            reader.abort();
        }
    }
}

impl SubprocessVerifier {
    /// Create a verifier with default settings
    ///
    /// # Arguments
    /// * `signaler` - Platform signaler used when the ready sentinel is seen
    ///
    /// # Example
    /// ```ignore
    /// let verifier = SubprocessVerifier::new(platform_signaler());
    /// ```
    pub fn new(signaler: Arc<dyn ShutdownSignaler>) -> Self {
        Self::with_config(signaler, VerifierConfig::default())
    }

    pub fn with_config(signaler: Arc<dyn ShutdownSignaler>, config: VerifierConfig) -> Self {
        Self { signaler, config }
    }

    /// Build the spawn command for a launch spec
    fn build_command(&self, launch: &LaunchSpec) -> Command {
        let mut command = Command::new(&launch.program);
        command
            .args(launch.command_args())
            .current_dir(&launch.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        self.signaler.prepare_command(&mut command);
        command
    }

    /// Race exit / ready / timeout and act on the winner
    async fn settle(
        &self,
        target: &VerificationTarget,
        process: &mut RunningProcess,
        mut ready_rx: oneshot::Receiver<()>,
        timeout: Duration,
    ) -> Verdict {
        let race = tokio::select! {
            status = process.child.wait() => Race::Exited(status),
            Ok(()) = &mut ready_rx => Race::Ready,
            _ = tokio::time::sleep(timeout) => Race::TimedOut,
        };

        match race {
            Race::Exited(Ok(status)) => Verdict::Exited(status.code()),
            Race::Exited(Err(e)) => {
                warn!(app = %target.name, error = %e, "Failed to wait for process");
                process.kill().await;
                Verdict::WaitFailed(e)
            }
            Race::Ready => {
                info!(
                    app = %target.name,
                    signaler = self.signaler.name(),
                    "Ready sentinel detected, requesting graceful stop"
                );
                let outcome = self
                    .signaler
                    .request_graceful_stop(&mut process.child, self.config.graceful_stop_timeout)
                    .await;

                match outcome {
                    StopOutcome::StoppedInTime => Verdict::Stopped,
                    StopOutcome::TimedOut => {
                        warn!(app = %target.name, "Graceful stop timed out, killing process");
                        process.kill().await;
                        Verdict::StopFailed
                    }
                }
            }
            Race::TimedOut => {
                warn!(
                    app = %target.name,
                    timeout_secs = timeout.as_secs_f64(),
                    "Verification timed out, killing process"
                );
                process.kill().await;
                Verdict::TimedOut
            }
        }
    }
}

#[async_trait]
impl ProcessVerifier for SubprocessVerifier {
    async fn verify(&self, target: &VerificationTarget, timeout: Duration) -> VerificationResult {
        let started_at = Utc::now();
        let clock = Instant::now();

        info!(
            app = %target.name,
            program = %target.launch.program,
            args = ?target.launch.command_args(),
            working_dir = %target.launch.working_dir.display(),
            timeout_secs = timeout.as_secs_f64(),
            "Starting verification"
        );

        let child = match self.build_command(&target.launch).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(app = %target.name, error = %e, "Failed to spawn target");
                return VerificationResult::error(target, e, CapturedOutput::default())
                    .with_timing(started_at, clock.elapsed());
            }
        };

        let pid = child.id();
        let (mut process, ready_rx) = RunningProcess::attach(child, &self.config.sentinel);

        let verdict = self.settle(target, &mut process, ready_rx, timeout).await;
        let duration = clock.elapsed();
        let output = process.drain(self.config.drain_timeout).await;
        drop(process);

        let result = match verdict {
            Verdict::Exited(code) => VerificationResult::exited(target, code, output),
            Verdict::Stopped => VerificationResult::gracefully_stopped(target, output),
            Verdict::StopFailed => VerificationResult::stop_failed(target, output),
            Verdict::TimedOut => VerificationResult::timed_out(target, timeout, output),
            Verdict::WaitFailed(e) => VerificationResult::error(target, e, output),
        }
        .with_timing(started_at, duration)
        .with_pid(pid);

        info!(
            app = %target.name,
            status = %result.status,
            exit_code = ?result.exit_code,
            duration_ms = duration.as_millis() as u64,
            "Verification completed"
        );

        result
    }
}
