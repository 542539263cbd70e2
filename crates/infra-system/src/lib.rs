// appverify Infrastructure - System Adapters
// Implements: ProcessVerifier, ShutdownSignaler, TargetSource, ProcessProbe

pub mod fs_discovery;
pub mod output_buffer;
pub mod process_probe_impl;
pub mod shutdown_signaler;
pub mod subprocess_verifier;

pub use fs_discovery::{DiscoveryConfig, FsDiscovery};
pub use process_probe_impl::ProcessProbeImpl;
pub use shutdown_signaler::platform_signaler;
pub use subprocess_verifier::{SubprocessVerifier, VerifierConfig};

#[cfg(unix)]
pub use shutdown_signaler::UnixInterruptSignaler;
#[cfg(windows)]
pub use shutdown_signaler::WindowsCtrlBreakSignaler;
