use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::analyzer::tool_management::ToolIdentity;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub paths: PathsConfig,
    pub intake: IntakeConfig,
    pub execution: ExecutionConfig,
}

/// Enable flag per analysis tool. Disabled tools are never run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub stegoveritas: bool,
    pub foremost: bool,
    pub steghide: bool,
    pub outguess: bool,
    pub strings: bool,
    pub exiv2: bool,
    pub exiftool: bool,
    pub binwalk: bool,
    pub xxd: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            stegoveritas: true,
            foremost: true,
            steghide: true,
            outguess: true,
            strings: true,
            exiv2: true,
            exiftool: true,
            binwalk: true,
            xxd: true,
        }
    }
}

impl ToolsConfig {
    pub fn is_enabled(&self, tool: ToolIdentity) -> bool {
        match tool {
            ToolIdentity::Stegoveritas => self.stegoveritas,
            ToolIdentity::Foremost => self.foremost,
            ToolIdentity::Steghide => self.steghide,
            ToolIdentity::Outguess => self.outguess,
            ToolIdentity::Strings => self.strings,
            ToolIdentity::Exiv2 => self.exiv2,
            ToolIdentity::Exiftool => self.exiftool,
            ToolIdentity::Binwalk => self.binwalk,
            ToolIdentity::Xxd => self.xxd,
        }
    }

    pub fn enabled(&self) -> Vec<ToolIdentity> {
        ToolIdentity::ALL
            .into_iter()
            .filter(|t| self.is_enabled(*t))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root under which checksum-named run directories are created.
    pub upload_dir: PathBuf,
    /// Local fallback directory for tool binaries.
    pub bin_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            bin_dir: PathBuf::from("bin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Exclusive upper bound in bytes.
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    /// How long run directories are kept before cleanup.
    pub retention_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retention_secs: 600,
        }
    }
}

impl IntakeConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub probe_timeout_secs: u64,
    /// `None` runs analysis tools without a time limit.
    pub analysis_timeout_secs: Option<u64>,
    pub install_timeout_secs: u64,
    pub use_sudo: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 2,
            analysis_timeout_secs: Some(600),
            install_timeout_secs: 900,
            use_sudo: true,
        }
    }
}

impl ExecutionConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn analysis_timeout(&self) -> Option<Duration> {
        self.analysis_timeout_secs.map(Duration::from_secs)
    }

    pub fn install_timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.install_timeout_secs))
    }
}
