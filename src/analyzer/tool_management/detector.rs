use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::catalog::ToolIdentity;

/// Where a resolved executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolSource {
    SearchPath,
    LocalFallback,
}

/// Outcome of resolving one tool. Short-lived: tools can be installed in the
/// middle of a session, so callers re-resolve instead of keeping these around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTool {
    pub identity: ToolIdentity,
    pub command: String,
    pub path: Option<PathBuf>,
    pub source: Option<ToolSource>,
}

impl ResolvedTool {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }

    fn unavailable(identity: ToolIdentity, command: &str) -> Self {
        Self {
            identity,
            command: command.to_string(),
            path: None,
            source: None,
        }
    }
}

/// Resolves bare command names to executables: the process search path first,
/// then a configured local `bin` directory.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    fallback_dir: PathBuf,
    search_path: Option<OsString>,
}

impl ToolLocator {
    pub fn new(fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            fallback_dir: fallback_dir.into(),
            search_path: None,
        }
    }

    /// Resolve against an explicit search path instead of `$PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn fallback_dir(&self) -> &Path {
        &self.fallback_dir
    }

    pub fn locate(&self, identity: ToolIdentity) -> ResolvedTool {
        let command = identity.base_command();
        match self.resolve_command(command) {
            Some((path, source)) => ResolvedTool {
                identity,
                command: command.to_string(),
                path: Some(path),
                source: Some(source),
            },
            None => ResolvedTool::unavailable(identity, command),
        }
    }

    /// Resolve any bare command name. Names containing a path separator are
    /// refused outright.
    pub fn resolve_command(&self, command: &str) -> Option<(PathBuf, ToolSource)> {
        if command.is_empty() || command.contains('/') || command.contains('\\') {
            debug!("Refusing to resolve non-bare command name {:?}", command);
            return None;
        }

        if let Some(path) = self.find_in_search_path(command) {
            debug!("Found {} on search path at {}", command, path.display());
            return Some((path, ToolSource::SearchPath));
        }

        let local = self.fallback_dir.join(command);
        if is_executable_file(&local) {
            info!("Using local fallback binary for {} at {}", command, local.display());
            return Some((local, ToolSource::LocalFallback));
        }

        debug!("Tool {} not found on search path or in {}", command, self.fallback_dir.display());
        None
    }

    pub fn is_available(&self, command: &str) -> bool {
        self.resolve_command(command).is_some()
    }

    fn find_in_search_path(&self, command: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(command, Some(paths), cwd).ok()
            }
            None => which::which(command).ok(),
        }
    }
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self::new("bin")
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\necho ok\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn unavailable_when_nowhere_to_be_found() {
        let empty_path = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let locator = ToolLocator::new(bin.path()).with_search_path(empty_path.path());

        for tool in ToolIdentity::ALL {
            let resolved = locator.locate(tool);
            assert!(!resolved.available(), "{} should be unavailable", tool);
            assert!(resolved.source.is_none());
        }
    }

    #[test]
    fn search_path_wins_over_fallback() {
        let search = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let on_path = write_file(search.path(), "binwalk", 0o755);
        write_file(bin.path(), "binwalk", 0o755);

        let locator = ToolLocator::new(bin.path()).with_search_path(search.path());
        let resolved = locator.locate(ToolIdentity::Binwalk);

        assert_eq!(resolved.source, Some(ToolSource::SearchPath));
        assert_eq!(resolved.path.unwrap().canonicalize().unwrap(), on_path.canonicalize().unwrap());
    }

    #[test]
    fn fallback_dir_requires_executable_bit() {
        let search = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        write_file(bin.path(), "foremost", 0o644);

        let locator = ToolLocator::new(bin.path()).with_search_path(search.path());
        assert!(!locator.locate(ToolIdentity::Foremost).available());

        std::fs::set_permissions(
            bin.path().join("foremost"),
            std::fs::Permissions::from_mode(0o755),
        )
        .unwrap();
        let resolved = locator.locate(ToolIdentity::Foremost);
        assert_eq!(resolved.source, Some(ToolSource::LocalFallback));
        assert_eq!(resolved.path, Some(bin.path().join("foremost")));
    }

    #[test]
    fn path_fragments_are_never_resolved() {
        let bin = TempDir::new().unwrap();
        let locator = ToolLocator::new(bin.path());
        assert!(locator.resolve_command("../bin/sh").is_none());
        assert!(locator.resolve_command("").is_none());
    }
}
