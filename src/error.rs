use std::path::PathBuf;
use thiserror::Error;

use crate::analyzer::tool_management::ToolIdentity;

/// Top-level error for everything that can abort a command.
///
/// Per-module tool failures are deliberately absent here: they are recorded on
/// the module's `ExecutionResult` and never abort a run.
#[derive(Error, Debug)]
pub enum StegoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Installation error: {0}")]
    Install(#[from] InstallError),

    #[error("Upload rejected: {0}")]
    Intake(#[from] IntakeError),

    #[error("Unable to prepare output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Analysis target {0} does not exist or is not a regular file")]
    InvalidTarget(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file {path}: {reason}")]
    ParsingFailed { path: PathBuf, reason: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),
}

/// Optional analysis parameters that failed validation. Always raised before
/// any subprocess is spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("{name} contains a NUL byte")]
    NulByte { name: &'static str },
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Could not detect package manager. Manual installation required.")]
    PlanUnavailable,

    #[error("Automatic installation requires explicit confirmation")]
    ConfirmationRequired,

    #[error("No installation command available for {0}")]
    NoCommand(ToolIdentity),

    #[error("Installing {tool} failed: {reason}")]
    AutoInstallFailed {
        tool: ToolIdentity,
        reason: String,
        output: String,
    },
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("File {0} does not exist")]
    Missing(PathBuf),

    #[error("File is too large ({size} bytes). Maximum filesize: {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Only the following image formats are allowed: {allowed}. Your file: .{extension}")]
    ExtensionNotAllowed { extension: String, allowed: String },

    #[error("File is not a valid image or image is corrupted")]
    NotAnImage,

    #[error("Invalid image MIME type: {0}")]
    MimeNotAllowed(String),
}

/// Why a single analysis module produced no usable result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    #[error("Tool '{tool}' not found. Please install it to use this analysis module.")]
    ToolNotFound { tool: String },

    #[error("Tool '{tool}' is installed but cannot start: {}", library_detail(.library))]
    ToolLibraryMissing {
        tool: String,
        library: Option<String>,
    },

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolExecutionError { tool: String, message: String },
}

fn library_detail(library: &Option<String>) -> String {
    match library {
        Some(lib) => format!("missing shared library {}", lib),
        None => "a shared library is missing or the binary is incompatible with this host".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, StegoError>;
