// Filesystem target discovery
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use appverify_core::application::constants::{
    DEFAULT_LAUNCHER, DEFAULT_TARGET_EXTENSION, PROJECT_MARKER_EXTENSION, RUN_SETTINGS_SUFFIX,
};
use appverify_core::domain::{PlatformRequirement, RunSettings, VerificationTarget};
use appverify_core::port::TargetSource;
use appverify_core::{AppError, Result};

/// Discovery settings
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Directory whose subdirectories are scanned
    pub root: PathBuf,
    /// Program used to launch each target file
    pub launcher: String,
    /// Extension of target files (without dot)
    pub extension: String,
    /// Directories containing a file with this extension are skipped
    pub project_marker_extension: String,
}

impl DiscoveryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            launcher: DEFAULT_LAUNCHER.to_string(),
            extension: DEFAULT_TARGET_EXTENSION.to_string(),
            project_marker_extension: PROJECT_MARKER_EXTENSION.to_string(),
        }
    }
}

/// Walks the tree under the root and builds one target per program file
///
/// Files directly in the root are not targets; only subdirectories are
/// searched, recursively. Directories holding a project package are skipped
/// along with everything below them.
pub struct FsDiscovery {
    config: DiscoveryConfig,
}

impl FsDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    fn has_extension(path: &Path, extension: &str) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false)
    }

    /// Sorted (subdirectories, files) of one directory
    fn list_dir(dir: &Path) -> std::io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                dirs.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }

        dirs.sort();
        files.sort();
        Ok((dirs, files))
    }

    fn collect(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let (subdirs, _) = Self::list_dir(dir)?;

        for sub in subdirs {
            let (_, files) = match Self::list_dir(&sub) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(dir = %sub.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            if files
                .iter()
                .any(|f| Self::has_extension(f, &self.config.project_marker_extension))
            {
                debug!(dir = %sub.display(), "Skipping project package directory");
                continue;
            }

            out.extend(
                files
                    .into_iter()
                    .filter(|f| Self::has_extension(f, &self.config.extension)),
            );

            if let Err(e) = self.collect(&sub, out) {
                warn!(dir = %sub.display(), error = %e, "Skipping unreadable directory");
            }
        }

        Ok(())
    }

    /// Whether a sibling `<stem>.run.json` asks for the verify profile
    ///
    /// Missing or unreadable settings mean "no profile".
    fn wants_verify_profile(path: &Path) -> bool {
        let Some(stem) = path.file_stem() else {
            return false;
        };
        let settings_path = path.with_file_name(format!(
            "{}{}",
            stem.to_string_lossy(),
            RUN_SETTINGS_SUFFIX
        ));
        if !settings_path.is_file() {
            return false;
        }

        let parsed = fs::read_to_string(&settings_path)
            .map_err(AppError::from)
            .and_then(|content| RunSettings::from_json(&content));

        match parsed {
            Ok(settings) => settings.has_verify_profile(),
            Err(e) => {
                warn!(
                    settings = %settings_path.display(),
                    error = %e,
                    "Ignoring unreadable run settings"
                );
                false
            }
        }
    }

    /// Platform the program declares; unreadable sources run everywhere
    fn platform_requirement(path: &Path) -> PlatformRequirement {
        match fs::read_to_string(path) {
            Ok(source) => PlatformRequirement::from_source(&source),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Could not read source for platform check");
                PlatformRequirement::Any
            }
        }
    }
}

impl TargetSource for FsDiscovery {
    fn discover(&self) -> Result<Vec<VerificationTarget>> {
        let root = &self.config.root;
        if !root.is_dir() {
            return Err(AppError::Discovery(format!(
                "root is not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        self.collect(root, &mut files)?;

        let targets: Vec<VerificationTarget> = files
            .into_iter()
            .filter(|path| {
                let requirement = Self::platform_requirement(path);
                let supported = requirement.matches_current();
                if !supported {
                    info!(file = %path.display(), requirement = ?requirement, "Skipping target for other platform");
                }
                supported
            })
            .map(|path| {
                let verify_profile = Self::wants_verify_profile(&path);
                VerificationTarget::for_file(path, &self.config.launcher, verify_profile)
            })
            .collect();

        info!(root = %root.display(), count = targets.len(), "Discovery completed");
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(targets: &[VerificationTarget]) -> Vec<String> {
        targets.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn test_discovery_rules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(&root.join("verify.cs"), "// harness itself");
        write(&root.join("flat/cat.cs"), "Console.WriteLine(\"cat\");");
        write(&root.join("flat/webapi.cs"), "#:sdk Microsoft.NET.Sdk.Web");
        write(
            &root.join("flat/webapi.run.json"),
            r#"{"profiles": {"verify": {"commandLineArgs": ""}}}"#,
        );
        write(&root.join("flat/broken.cs"), "Console.WriteLine(1);");
        write(&root.join("flat/broken.run.json"), "{ nope");
        write(&root.join("flat/readme.md"), "# docs");
        write(
            &root.join("flat/winonly.cs"),
            "#:property TargetFramework=net10.0-windows\n",
        );
        write(&root.join("razorapp/razorapp.cs"), "// project code");
        write(&root.join("razorapp/razorapp.csproj"), "<Project />");
        write(&root.join("razorapp/sub/inner.cs"), "// below a project");
        write(&root.join("nested/deeper/hello.cs"), "Console.WriteLine(2);");

        let discovery = FsDiscovery::new(DiscoveryConfig::new(root));
        let targets = discovery.discover().unwrap();

        let mut expected = vec!["broken.cs", "cat.cs", "webapi.cs"];
        if cfg!(windows) {
            expected.push("winonly.cs");
        }
        expected.push("hello.cs");
        assert_eq!(names(&targets), expected);

        let webapi = targets.iter().find(|t| t.name == "webapi.cs").unwrap();
        assert!(webapi.launch.verify_profile);
        assert_eq!(webapi.launch.program, "dotnet");
        assert_eq!(webapi.launch.working_dir, root.join("flat"));

        let broken = targets.iter().find(|t| t.name == "broken.cs").unwrap();
        assert!(!broken.launch.verify_profile);
    }

    #[test]
    fn test_custom_extension_and_launcher() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("apps/a.sh"), "echo a");
        write(&dir.path().join("apps/b.cs"), "// ignored");

        let config = DiscoveryConfig {
            launcher: "sh".to_string(),
            extension: "sh".to_string(),
            ..DiscoveryConfig::new(dir.path())
        };
        let targets = FsDiscovery::new(config).discover().unwrap();

        assert_eq!(names(&targets), vec!["a.sh"]);
        assert_eq!(targets[0].launch.program, "sh");
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = FsDiscovery::new(DiscoveryConfig::new(missing)).discover();

        assert!(matches!(result, Err(AppError::Discovery(_))));
    }

    #[test]
    fn test_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let targets = FsDiscovery::new(DiscoveryConfig::new(dir.path()))
            .discover()
            .unwrap();
        assert!(targets.is_empty());
    }
}
