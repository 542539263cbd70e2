// Target Source Port
// Supplies the list of programs to verify

use crate::domain::VerificationTarget;

/// Target discovery trait
///
/// Implementations decide which programs are candidates and how each is
/// launched. Unreadable per-target metadata must fall back to defaults; only
/// failing to read the root itself is an error.
pub trait TargetSource: Send + Sync {
    /// Enumerate targets in a deterministic order
    fn discover(&self) -> crate::Result<Vec<VerificationTarget>>;
}
