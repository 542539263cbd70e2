// Domain Layer - Pure verification entities

pub mod result;
pub mod target;

// Re-exports
pub use result::{CapturedOutput, ResultSet, RunOutcome, VerificationResult, VerificationStatus};
pub use target::{LaunchSpec, PlatformRequirement, RunSettings, VerificationTarget};
