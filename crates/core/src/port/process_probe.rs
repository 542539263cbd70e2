// Process Probe Port
// Liveness checks for confirming that a verified target has terminated

/// Process probe trait
pub trait ProcessProbe: Send + Sync {
    /// Check if a process is still alive
    ///
    /// # Arguments
    /// * `pid` - Process ID to check
    ///
    /// Zombies (exited but not yet reaped) count as dead.
    fn is_alive(&self, pid: u32) -> bool;
}
