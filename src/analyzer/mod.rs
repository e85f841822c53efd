//! # Analyzer Module
//!
//! Everything between a staged image and an aggregated report:
//! - Tool resolution, probing and install advice
//! - Safe execution and textual classification of tool output
//! - The analysis pipeline and artifact discovery
//! - Intake of uploads and deferred cleanup of run directories

pub mod classifier;
pub mod housekeeping;
pub mod intake;
pub mod pipeline;
pub mod tool_management;

pub use classifier::{Classification, ErrorClassifier};
pub use intake::{stage_upload, StagedUpload};
pub use pipeline::{
    AnalysisParameters, AnalysisPipeline, AnalysisRun, Artifact, ArtifactSet, ExecutionResult,
    MediaType, ModuleStatus,
};
pub use tool_management::{
    AvailabilityProbe, InstallAdvisor, InstallPlan, ModuleKey, PackageManagerKind, ProbeReport,
    ProbeStatus, Remediation, ToolIdentity, ToolLocator,
};
