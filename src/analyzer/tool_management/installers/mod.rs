//! # Installation tables
//!
//! Per package manager install recipes for every analysis tool, plus the
//! manual instructions used when no recipe applies.

pub mod common;

pub use common::{manual_instructions, recipe_for, InstallRecipe};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host software-installation mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    Apt,
    Yum,
    Dnf,
    Pacman,
    Brew,
    Unknown,
}

impl PackageManagerKind {
    /// Detection order; the first manager whose query command resolves wins.
    pub const DETECTION_ORDER: [PackageManagerKind; 5] = [
        PackageManagerKind::Apt,
        PackageManagerKind::Yum,
        PackageManagerKind::Dnf,
        PackageManagerKind::Pacman,
        PackageManagerKind::Brew,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManagerKind::Apt => "apt",
            PackageManagerKind::Yum => "yum",
            PackageManagerKind::Dnf => "dnf",
            PackageManagerKind::Pacman => "pacman",
            PackageManagerKind::Brew => "brew",
            PackageManagerKind::Unknown => "unknown",
        }
    }

    /// Command whose presence on the search path identifies the manager.
    pub fn query_command(&self) -> Option<&'static str> {
        match self {
            PackageManagerKind::Apt => Some("apt-get"),
            PackageManagerKind::Yum => Some("yum"),
            PackageManagerKind::Dnf => Some("dnf"),
            PackageManagerKind::Pacman => Some("pacman"),
            PackageManagerKind::Brew => Some("brew"),
            PackageManagerKind::Unknown => None,
        }
    }

    /// Homebrew refuses to run as root; everything else needs it.
    pub fn needs_root(&self) -> bool {
        !matches!(self, PackageManagerKind::Brew | PackageManagerKind::Unknown)
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
