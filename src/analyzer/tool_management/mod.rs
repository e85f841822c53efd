//! # Tool Management Module
//!
//! Resolution, availability probing and installation advice for the external
//! programs the analysis pipeline drives.

pub mod catalog;
pub mod detector;
pub mod installer;
pub mod installers;
pub mod status;

pub use catalog::{ModuleKey, ToolIdentity};
pub use detector::{ResolvedTool, ToolLocator, ToolSource};
pub use installer::{
    AutoInstallOutcome, AutoInstallReport, AutoInstallRequest, InstallAdvisor, InstallPlan,
    Remediation,
};
pub use installers::PackageManagerKind;
pub use status::{AvailabilityProbe, ProbeReport, ProbeStatus};
