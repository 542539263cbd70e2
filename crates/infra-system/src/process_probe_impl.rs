// Process probe implementation
// reason: sysinfo for cross-platform process lookup
use std::sync::{Mutex, PoisonError};
use sysinfo::{Pid, ProcessStatus, System};
use tracing::debug;

use appverify_core::port::ProcessProbe;

/// Process probe implementation using sysinfo
pub struct ProcessProbeImpl {
    system: Mutex<System>,
}

impl ProcessProbeImpl {
    /// Create a new process probe
    ///
    /// # Example
    /// ```ignore
    /// let probe = ProcessProbeImpl::new();
    /// assert!(!probe.is_alive(pid));
    /// ```
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessProbeImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for ProcessProbeImpl {
    fn is_alive(&self, pid: u32) -> bool {
        let mut sys = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let pid = Pid::from_u32(pid);

        if !sys.refresh_process(pid) {
            return false;
        }

        let alive = sys
            .process(pid)
            .map(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
            .unwrap_or(false);

        debug!(pid = %pid, alive = alive, "Process liveness checked");
        alive
    }
}
