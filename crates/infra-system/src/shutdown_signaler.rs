// Platform shutdown signalers
// reason: nix on Unix, windows-sys console API on Windows
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

use appverify_core::port::{ShutdownSignaler, StopOutcome};

/// Signaler for the platform this binary was built for
#[cfg(unix)]
pub fn platform_signaler() -> Arc<dyn ShutdownSignaler> {
    Arc::new(UnixInterruptSignaler)
}

/// Signaler for the platform this binary was built for
#[cfg(windows)]
pub fn platform_signaler() -> Arc<dyn ShutdownSignaler> {
    Arc::new(WindowsCtrlBreakSignaler)
}

fn has_exited(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(Some(_)))
}

/// Wait up to `timeout` for the process to exit after the stop request
async fn wait_for_exit(child: &mut Child, timeout: Duration) -> StopOutcome {
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(exit_code = ?status.code(), "Process exited after stop request");
            StopOutcome::StoppedInTime
        }
        Ok(Err(e)) => {
            // Unknown state: let the caller kill it
            warn!(error = %e, "Failed to wait for process after stop request");
            StopOutcome::TimedOut
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for process to exit");
            StopOutcome::TimedOut
        }
    }
}

/// SIGINT to the process id, then wait
#[cfg(unix)]
pub struct UnixInterruptSignaler;

#[cfg(unix)]
#[async_trait]
impl ShutdownSignaler for UnixInterruptSignaler {
    async fn request_graceful_stop(&self, child: &mut Child, timeout: Duration) -> StopOutcome {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if has_exited(child) {
            return StopOutcome::StoppedInTime;
        }
        let Some(pid) = child.id() else {
            return StopOutcome::StoppedInTime;
        };

        info!(pid = %pid, "Sending SIGINT for graceful shutdown");
        match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return StopOutcome::StoppedInTime,
            Err(e) => warn!(pid = %pid, error = %e, "SIGINT delivery failed"),
        }

        wait_for_exit(child, timeout).await
    }

    fn name(&self) -> &'static str {
        "unix-sigint"
    }
}

/// CTRL_BREAK_EVENT to the process group, then wait
///
/// Targets are spawned with CREATE_NEW_PROCESS_GROUP so the group id equals
/// the process id and the harness itself does not receive the event.
#[cfg(windows)]
pub struct WindowsCtrlBreakSignaler;

#[cfg(windows)]
#[async_trait]
impl ShutdownSignaler for WindowsCtrlBreakSignaler {
    fn prepare_command(&self, command: &mut tokio::process::Command) {
        use windows_sys::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;

        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    async fn request_graceful_stop(&self, child: &mut Child, timeout: Duration) -> StopOutcome {
        use windows_sys::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};

        if has_exited(child) {
            return StopOutcome::StoppedInTime;
        }
        let Some(pid) = child.id() else {
            return StopOutcome::StoppedInTime;
        };

        info!(pid = %pid, "Sending Ctrl+Break to process group");
        // SAFETY: plain FFI call with integer arguments, no pointers involved
        let delivered = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) };
        if delivered == 0 {
            warn!(
                pid = %pid,
                error = %std::io::Error::last_os_error(),
                "Ctrl+Break delivery failed"
            );
        }

        wait_for_exit(child, timeout).await
    }

    fn name(&self) -> &'static str {
        "windows-ctrl-break"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn spawn(program: &str, args: &[&str]) -> Child {
        Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_already_exited_is_stopped_in_time() {
        let mut child = spawn("true", &[]);
        child.wait().await.unwrap();

        let outcome = UnixInterruptSignaler
            .request_graceful_stop(&mut child, Duration::from_millis(500))
            .await;

        assert_eq!(outcome, StopOutcome::StoppedInTime);

        // Asking again is still fine
        let outcome = UnixInterruptSignaler
            .request_graceful_stop(&mut child, Duration::from_millis(500))
            .await;
        assert_eq!(outcome, StopOutcome::StoppedInTime);
    }

    #[tokio::test]
    async fn test_sigint_stops_default_handler() {
        let mut child = spawn("sleep", &["30"]);

        let outcome = UnixInterruptSignaler
            .request_graceful_stop(&mut child, Duration::from_secs(2))
            .await;

        assert_eq!(outcome, StopOutcome::StoppedInTime);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ignored_sigint_times_out_without_kill() {
        let mut child = spawn("sh", &["-c", "trap '' INT; sleep 5"]);
        // Give the shell time to install the trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let outcome = UnixInterruptSignaler
            .request_graceful_stop(&mut child, Duration::from_millis(300))
            .await;

        assert_eq!(outcome, StopOutcome::TimedOut);
        // Signaler never force-kills
        assert!(child.try_wait().unwrap().is_none());

        child.kill().await.unwrap();
    }

    #[test]
    fn test_platform_signaler_is_unix() {
        assert_eq!(platform_signaler().name(), "unix-sigint");
    }
}
