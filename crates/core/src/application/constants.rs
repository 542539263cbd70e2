// Harness constants (No magic values)
use std::time::Duration;

/// Default per-target timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How long a target gets to exit after a graceful stop request (1 second)
/// Nested inside the per-target timeout, does not restart it
pub const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on waiting for stdout/stderr readers to drain after the race
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Stdout substring announcing that a long-running target is ready to be stopped
pub const READY_SENTINEL: &str = "Press Ctrl+C to shut down.";

/// Program used to launch each target file
pub const DEFAULT_LAUNCHER: &str = "dotnet";

/// File extension of launchable target programs
pub const DEFAULT_TARGET_EXTENSION: &str = "cs";

/// Directories holding a file with this extension are pre-built project packages
pub const PROJECT_MARKER_EXTENSION: &str = "csproj";

/// Suffix of the per-target launch settings file (`<stem>.run.json`)
pub const RUN_SETTINGS_SUFFIX: &str = ".run.json";
