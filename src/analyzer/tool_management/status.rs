use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::catalog::ToolIdentity;
use super::detector::{ToolLocator, ToolSource};
use crate::analyzer::classifier::{Classification, ErrorClassifier};
use crate::common::command_utils::{CommandRunner, CommandSpec};

static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+\.\d+(?:\.\d+)?(?:[-.][A-Za-z0-9]+)*)\b").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProbeStatus {
    Available,
    NotFound,
    LibraryMissing { library: Option<String> },
    /// Resolved but the self-test misbehaved (hung or could not start).
    Broken { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub tool: ToolIdentity,
    pub status: ProbeStatus,
    pub path: Option<PathBuf>,
    pub source: Option<ToolSource>,
    pub version: Option<String>,
}

impl ProbeReport {
    pub fn available(&self) -> bool {
        self.status == ProbeStatus::Available
    }

    pub fn error(&self) -> Option<String> {
        match &self.status {
            ProbeStatus::Available => None,
            ProbeStatus::NotFound => Some(format!("{} not found", self.tool)),
            ProbeStatus::LibraryMissing { library: Some(lib) } => {
                Some(format!("missing shared library {}", lib))
            }
            ProbeStatus::LibraryMissing { library: None } => {
                Some("missing shared library or incompatible binary".to_string())
            }
            ProbeStatus::Broken { message } => Some(message.clone()),
        }
    }
}

/// Cheap pre-flight check: resolve each tool and run its version/help flag
/// under a short timeout. Never touches an analysis target.
#[derive(Debug, Clone)]
pub struct AvailabilityProbe {
    locator: ToolLocator,
    runner: CommandRunner,
}

impl AvailabilityProbe {
    pub fn new(locator: ToolLocator, timeout: Duration) -> Self {
        Self {
            locator,
            runner: CommandRunner::new(Some(timeout)),
        }
    }

    pub async fn probe(
        &self,
        tools: impl IntoIterator<Item = ToolIdentity>,
    ) -> BTreeMap<ToolIdentity, ProbeReport> {
        let mut reports = BTreeMap::new();
        for tool in tools {
            let report = self.probe_one(tool).await;
            reports.insert(tool, report);
        }
        reports
    }

    pub async fn probe_one(&self, tool: ToolIdentity) -> ProbeReport {
        let resolved = self.locator.locate(tool);
        let mut report = ProbeReport {
            tool,
            status: ProbeStatus::NotFound,
            path: resolved.path.clone(),
            source: resolved.source,
            version: None,
        };
        let Some(path) = resolved.path else {
            return report;
        };

        let spec = CommandSpec::new(&path).args(tool.probe_args());
        report.status = match self.runner.run(&spec).await {
            Ok(outcome) => match ErrorClassifier::classify(&outcome.combined_output) {
                Classification::LibraryMissing { library } => ProbeStatus::LibraryMissing { library },
                Classification::NotFound => ProbeStatus::NotFound,
                _ if outcome.timed_out => ProbeStatus::Broken {
                    message: format!("self-test timed out after {}s", outcome.duration.as_secs().max(1)),
                },
                _ => {
                    report.version = extract_version(&outcome.combined_output);
                    ProbeStatus::Available
                }
            },
            Err(e) => match ErrorClassifier::classify_spawn_error(&e) {
                Classification::NotFound => ProbeStatus::NotFound,
                Classification::LibraryMissing { library } => ProbeStatus::LibraryMissing { library },
                _ => ProbeStatus::Broken {
                    message: format!("failed to start: {}", e),
                },
            },
        };
        debug!("Probe {}: {:?}", tool, report.status);
        report
    }
}

/// First dotted version number in `output`.
pub fn extract_version(output: &str) -> Option<String> {
    VERSION
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
