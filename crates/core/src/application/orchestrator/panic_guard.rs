// Panic isolation for batch safety
// A panicking verification must never abort the batch
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::error;

use crate::domain::{CapturedOutput, VerificationResult, VerificationTarget};
use crate::port::ProcessVerifier;

/// Turn a panic payload into a readable message
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Run one verification on its own task so a panic is caught by the JoinHandle
///
/// Always yields exactly one result for `target`.
pub async fn verify_guarded(
    verifier: Arc<dyn ProcessVerifier>,
    target: VerificationTarget,
    timeout: Duration,
) -> VerificationResult {
    let started_at = Utc::now();
    let clock = Instant::now();

    let task_target = target.clone();
    let handle = tokio::task::spawn(async move { verifier.verify(&task_target, timeout).await });

    match handle.await {
        Ok(result) => result,
        Err(join_err) => {
            let reason = if join_err.is_panic() {
                let msg = panic_message(join_err.into_panic());
                error!(app = %target.name, panic_msg = %msg, "Verification panicked");
                format!("verification panicked: {}", msg)
            } else {
                error!(app = %target.name, "Verification task cancelled");
                "verification cancelled".to_string()
            };
            VerificationResult::error(&target, reason, CapturedOutput::default())
                .with_timing(started_at, clock.elapsed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VerificationStatus;
    use crate::port::process_verifier::mocks::{MockBehavior, MockProcessVerifier};

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(Box::new("static str")), "static str");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "Unknown panic");
    }

    #[tokio::test]
    async fn test_verify_guarded_catches_panic() {
        let verifier = Arc::new(MockProcessVerifier::new(MockBehavior::Panic(
            "exploded".to_string(),
        )));
        let target = VerificationTarget::for_file("/apps/a/a.cs", "dotnet", false);

        let result = verify_guarded(verifier, target.clone(), Duration::from_secs(1)).await;

        assert!(!result.success);
        assert_eq!(result.status, VerificationStatus::Error);
        assert_eq!(result.path, target.path);
        assert!(result.message.contains("exploded"));
    }
}
