//! appverify - run every program under a directory and check it starts and stops cleanly

mod logging;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use appverify_core::application::constants::{
    DEFAULT_LAUNCHER, DEFAULT_TARGET_EXTENSION, DEFAULT_TIMEOUT_SECS, GRACEFUL_STOP_TIMEOUT,
    READY_SENTINEL,
};
use appverify_core::application::{BatchOrchestrator, ExecutionMode};
use appverify_core::port::{NoopProgress, ProgressObserver, TargetSource};
use appverify_core::AppError;
use appverify_infra_system::{
    platform_signaler, DiscoveryConfig, FsDiscovery, SubprocessVerifier, VerifierConfig,
};

use report::ConsoleProgress;

#[derive(Parser)]
#[command(name = "appverify")]
#[command(about = "Verify that every program in a directory tree runs or starts and stops cleanly", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory whose subdirectories hold the programs (default: current directory)
    #[arg(long, env = "APPVERIFY_ROOT")]
    root: Option<String>,

    /// Verify all programs at once instead of one at a time
    #[arg(long, alias = "concurrent")]
    parallel: bool,

    /// Per-program timeout in seconds
    #[arg(short, long, env = "APPVERIFY_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Program used to launch each target file
    #[arg(long, env = "APPVERIFY_LAUNCHER", default_value = DEFAULT_LAUNCHER)]
    launcher: String,

    /// Extension of target files
    #[arg(long, default_value = DEFAULT_TARGET_EXTENSION)]
    extension: String,

    /// Stdout text announcing a program is ready to be stopped
    #[arg(long, default_value = READY_SENTINEL)]
    sentinel: String,

    /// How long a program gets to exit after a graceful stop request (ms)
    #[arg(long, default_value_t = GRACEFUL_STOP_TIMEOUT.as_millis() as u64)]
    stop_timeout_ms: u64,

    /// Print results as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn validate(&self) -> appverify_core::Result<()> {
        if self.timeout == 0 {
            return Err(AppError::Config("timeout must be at least 1 second".to_string()));
        }
        if self.extension.trim().is_empty() {
            return Err(AppError::Config("extension must not be empty".to_string()));
        }
        Ok(())
    }

    fn mode(&self) -> ExecutionMode {
        if self.parallel {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        }
    }
}

/// Base directory for discovery; failing to determine it is fatal
fn resolve_root(raw: Option<&str>) -> Result<PathBuf> {
    let root = match raw {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => std::env::current_dir().context("Could not determine base directory")?,
    };

    root.canonicalize()
        .with_context(|| format!("Could not determine base directory: {}", root.display()))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    cli.validate()?;
    let root = resolve_root(cli.root.as_deref())?;
    let mode = cli.mode();

    if !cli.json {
        println!("{} {}", "Scanning for programs from:".cyan(), root.display());
        println!("{} {}", "Execution mode:".cyan(), mode);
        println!();
    }

    let discovery = FsDiscovery::new(DiscoveryConfig {
        launcher: cli.launcher.clone(),
        extension: cli.extension.trim_start_matches('.').to_string(),
        ..DiscoveryConfig::new(&root)
    });
    let targets = discovery.discover().context("Target discovery failed")?;

    if targets.is_empty() {
        if cli.json {
            println!("[]");
        } else {
            println!("{}", "No executable programs found".yellow());
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.json {
        println!("{}", format!("Found {} program(s) to verify", targets.len()).green());
        println!();
    }

    let signaler = platform_signaler();
    info!(signaler = signaler.name(), "Platform signaler selected");

    let verifier = Arc::new(SubprocessVerifier::with_config(
        signaler,
        VerifierConfig {
            sentinel: cli.sentinel.clone(),
            graceful_stop_timeout: Duration::from_millis(cli.stop_timeout_ms),
            ..Default::default()
        },
    ));

    let observer: Arc<dyn ProgressObserver> = if cli.json {
        Arc::new(NoopProgress)
    } else {
        Arc::new(ConsoleProgress)
    };

    let orchestrator = BatchOrchestrator::new(verifier).with_observer(observer);
    let results = orchestrator
        .run_all(targets, mode, Duration::from_secs(cli.timeout))
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!();
        report::print_report(&results);
    }

    Ok(ExitCode::from(results.outcome().exit_code() as u8))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("{} {:#}", "Warning:".yellow(), e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["appverify"]).unwrap();

        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cli.mode(), ExecutionMode::Sequential);
        assert_eq!(cli.launcher, "dotnet");
        assert_eq!(cli.sentinel, READY_SENTINEL);
        assert_eq!(cli.stop_timeout_ms, 1000);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_parallel_and_timeout() {
        let cli = Cli::try_parse_from(["appverify", "--parallel", "--timeout", "30"]).unwrap();
        assert_eq!(cli.mode(), ExecutionMode::Concurrent);
        assert_eq!(cli.timeout, 30);

        let cli = Cli::try_parse_from(["appverify", "--concurrent"]).unwrap();
        assert_eq!(cli.mode(), ExecutionMode::Concurrent);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cli = Cli::try_parse_from(["appverify", "-t", "0"]).unwrap();
        assert!(matches!(cli.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_resolve_root_missing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = resolve_root(Some(missing.to_str().unwrap())).unwrap_err();
        assert!(err.to_string().contains("Could not determine base directory"));
    }

    #[test]
    fn test_resolve_root_existing() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_root(Some(dir.path().to_str().unwrap())).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }
}
