// Verification Target Domain Model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Launch profile name requested by targets that need special startup settings
pub const VERIFY_PROFILE: &str = "verify";

/// Argument used to select a launch profile
pub const LAUNCH_PROFILE_FLAG: &str = "--launch-profile";

/// Directive prefix declaring the target framework inside a program source file
const TARGET_FRAMEWORK_DIRECTIVE: &str = "#:property TargetFramework=";

/// How to start one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Append `--launch-profile verify` when spawning
    pub verify_profile: bool,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            verify_profile: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_verify_profile(mut self, enabled: bool) -> Self {
        self.verify_profile = enabled;
        self
    }

    /// Full argument list, including profile-selection arguments
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if self.verify_profile {
            args.push(LAUNCH_PROFILE_FLAG.to_string());
            args.push(VERIFY_PROFILE.to_string());
        }
        args
    }
}

/// One independently executable program to verify
///
/// Immutable once constructed: built by discovery, consumed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationTarget {
    pub path: PathBuf,
    pub name: String,
    pub launch: LaunchSpec,
}

impl VerificationTarget {
    pub fn new(path: impl Into<PathBuf>, launch: LaunchSpec) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self { path, name, launch }
    }

    /// Standard launch for a program file: `<launcher> <path>` run from the file's directory
    pub fn for_file(path: impl Into<PathBuf>, launcher: &str, verify_profile: bool) -> Self {
        let path = path.into();
        let working_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let launch = LaunchSpec::new(launcher, working_dir)
            .arg(path.to_string_lossy())
            .with_verify_profile(verify_profile);
        Self::new(path, launch)
    }

    /// Override the display name (defaults to the file name)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Sibling `<stem>.run.json` settings file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSettings {
    #[serde(default)]
    profiles: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RunSettings {
    pub fn from_json(content: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn has_verify_profile(&self) -> bool {
        self.profiles
            .as_ref()
            .map(|p| p.contains_key(VERIFY_PROFILE))
            .unwrap_or(false)
    }
}

/// Operating system a program declares it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformRequirement {
    Any,
    Windows,
}

impl PlatformRequirement {
    /// Read the requirement from the program's `#:property TargetFramework=` directive
    pub fn from_source(source: &str) -> Self {
        let windows_only = source
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_prefix(TARGET_FRAMEWORK_DIRECTIVE))
            .any(|tfm| tfm.trim().to_ascii_lowercase().contains("-windows"));

        if windows_only {
            PlatformRequirement::Windows
        } else {
            PlatformRequirement::Any
        }
    }

    pub fn matches_current(&self) -> bool {
        match self {
            PlatformRequirement::Any => true,
            PlatformRequirement::Windows => cfg!(windows),
        }
    }
}
