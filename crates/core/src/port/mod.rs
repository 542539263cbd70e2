// Port Layer - Interfaces for external dependencies

pub mod process_probe;
pub mod process_verifier;
pub mod progress;
pub mod shutdown_signaler;
pub mod target_source;

// Re-exports
pub use process_probe::ProcessProbe;
pub use process_verifier::ProcessVerifier;
pub use progress::{NoopProgress, ProgressObserver};
pub use shutdown_signaler::{ShutdownSignaler, StopOutcome};
pub use target_source::TargetSource;
