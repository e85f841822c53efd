//! # Analysis pipeline
//!
//! Runs the selected analysis modules against one staged file, one at a time,
//! and aggregates their outputs, secondary artifacts and failures into an
//! [`AnalysisRun`].

pub mod artifacts;
pub mod modules;
pub mod params;

pub use artifacts::{Artifact, ArtifactSet, MediaType};
pub use params::{AnalysisParameters, DERIVATION_COUNT_RANGE};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::analyzer::classifier::{Classification, ErrorClassifier};
use crate::analyzer::tool_management::{
    InstallAdvisor, InstallPlan, ModuleKey, ResolvedTool, ToolIdentity, ToolLocator,
};
use crate::common::command_utils::{program_name, CommandRunner};
use crate::config::Config;
use crate::config::types::ToolsConfig;
use crate::error::{Result, StegoError, ToolFailure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus {
    Success,
    NotFound,
    LibraryMissing { library: Option<String> },
    ToolError { message: String },
    /// A precondition was not met; the module was deliberately not run.
    Skipped { reason: String },
}

impl ModuleStatus {
    /// Skipped and unavailable modules never count as attempted.
    pub fn attempted(&self) -> bool {
        matches!(self, ModuleStatus::Success | ModuleStatus::ToolError { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ModuleStatus::NotFound | ModuleStatus::LibraryMissing { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModuleStatus::Success => "success",
            ModuleStatus::NotFound => "not found",
            ModuleStatus::LibraryMissing { .. } => "library missing",
            ModuleStatus::ToolError { .. } => "error",
            ModuleStatus::Skipped { .. } => "skipped",
        }
    }
}

impl From<Classification> for ModuleStatus {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Success => ModuleStatus::Success,
            Classification::NotFound => ModuleStatus::NotFound,
            Classification::LibraryMissing { library } => ModuleStatus::LibraryMissing { library },
            Classification::ToolError { message } => ModuleStatus::ToolError { message },
        }
    }
}

/// Outcome of one module in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub module: ModuleKey,
    pub tool: ToolIdentity,
    #[serde(flatten)]
    pub status: ModuleStatus,
    /// Raw combined stdout and stderr.
    pub output: String,
    /// Rendered failure or skip reason.
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub artifacts: ArtifactSet,
}

impl ExecutionResult {
    fn new(module: ModuleKey, status: ModuleStatus) -> Self {
        let error = match &status {
            ModuleStatus::Skipped { reason } => Some(reason.clone()),
            other => failure_for(module.tool(), other).map(|f| f.to_string()),
        };
        Self {
            module,
            tool: module.tool(),
            status,
            output: String::new(),
            error,
            exit_code: None,
            duration_ms: 0,
            artifacts: ArtifactSet::default(),
        }
    }

    /// The structured failure behind this result, if it has one.
    pub fn failure(&self) -> Option<ToolFailure> {
        failure_for(self.tool, &self.status)
    }

    /// Ran cleanly and produced output or at least one artifact.
    pub fn successful(&self) -> bool {
        self.status == ModuleStatus::Success
            && (!self.output.trim().is_empty() || !self.artifacts.is_empty())
    }
}

fn failure_for(tool: ToolIdentity, status: &ModuleStatus) -> Option<ToolFailure> {
    let tool = tool.as_str().to_string();
    match status {
        ModuleStatus::NotFound => Some(ToolFailure::ToolNotFound { tool }),
        ModuleStatus::LibraryMissing { library } => Some(ToolFailure::ToolLibraryMissing {
            tool,
            library: library.clone(),
        }),
        ModuleStatus::ToolError { message } => Some(ToolFailure::ToolExecutionError {
            tool,
            message: message.clone(),
        }),
        ModuleStatus::Success | ModuleStatus::Skipped { .. } => None,
    }
}

/// Aggregate of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub target: PathBuf,
    pub output_dir: PathBuf,
    pub selected_modules: Vec<ModuleKey>,
    /// Requested but switched off in configuration.
    pub disabled_modules: Vec<ModuleKey>,
    pub results: Vec<ExecutionResult>,
    pub missing_tools: BTreeSet<ToolIdentity>,
    pub install_plan: InstallPlan,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl AnalysisRun {
    pub fn total_modules(&self) -> usize {
        self.results.iter().filter(|r| r.status.attempted()).count()
    }

    pub fn successful_modules(&self) -> usize {
        self.results.iter().filter(|r| r.successful()).count()
    }

    pub fn result(&self, module: ModuleKey) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.module == module)
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "Ran {} of {} analysis modules successfully.",
            self.successful_modules(),
            self.total_modules()
        );
        if !self.missing_tools.is_empty() {
            line.push_str(&format!(" {} tool(s) not available.", self.missing_tools.len()));
        }
        line
    }
}

pub struct AnalysisPipeline {
    locator: ToolLocator,
    runner: CommandRunner,
    advisor: InstallAdvisor,
    tools: ToolsConfig,
}

impl AnalysisPipeline {
    pub fn new(locator: ToolLocator, timeout: Option<Duration>) -> Self {
        Self {
            advisor: InstallAdvisor::new(locator.clone(), None, false),
            locator,
            runner: CommandRunner::new(timeout),
            tools: ToolsConfig::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let locator = ToolLocator::new(&config.paths.bin_dir);
        Self::new(locator, config.execution.analysis_timeout()).with_tools(config.tools.clone())
    }

    pub fn with_tools(mut self, tools: ToolsConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Analyse `file`, writing tool output under `output_dir`.
    ///
    /// An empty `selection` means every enabled tool. Parameter and output
    /// directory problems abort before any tool runs; everything that goes
    /// wrong with an individual tool is recorded on its result instead.
    pub async fn run_analysis(
        &self,
        file: &Path,
        output_dir: &Path,
        selection: &[ToolIdentity],
        params: &AnalysisParameters,
    ) -> Result<AnalysisRun> {
        params.validate()?;

        let target = std::fs::canonicalize(file)
            .ok()
            .filter(|p| p.is_file())
            .ok_or_else(|| StegoError::InvalidTarget(file.to_path_buf()))?;

        let (selected, disabled) = self.select_modules(selection);
        prepare_output_dir(output_dir, &selected)?;
        let output_dir = std::fs::canonicalize(output_dir).map_err(|source| {
            StegoError::OutputDirectory {
                path: output_dir.to_path_buf(),
                source,
            }
        })?;

        let started_at = Utc::now();
        let started = Instant::now();
        info!(
            "Analysing {} with {} module(s) ({:?})",
            target.display(),
            selected.len(),
            params
        );
        for module in &disabled {
            debug!("{} disabled in configuration", module);
        }

        let mut resolved: HashMap<ToolIdentity, ResolvedTool> = HashMap::new();
        let mut results: Vec<ExecutionResult> = Vec::with_capacity(selected.len());
        for &module in &selected {
            let tool = resolved
                .entry(module.tool())
                .or_insert_with(|| self.locator.locate(module.tool()))
                .clone();
            let result = self
                .run_module(module, &tool, &target, &output_dir, params, &results)
                .await;
            results.push(result);
        }

        // Files left by an earlier run must not be credited to a module that
        // did not run this time.
        for result in results.iter_mut().filter(|r| r.status.attempted()) {
            result.artifacts = artifacts::scan(result.module, &output_dir);
        }

        let missing_tools: BTreeSet<ToolIdentity> = results
            .iter()
            .filter(|r| r.status.is_unavailable())
            .map(|r| r.tool)
            .collect();
        if !missing_tools.is_empty() {
            warn!(
                "Unavailable tools: {}",
                missing_tools.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
            );
        }
        let install_plan = self.advisor.plan_for(missing_tools.iter().copied());

        let run = AnalysisRun {
            target,
            output_dir,
            selected_modules: selected,
            disabled_modules: disabled,
            results,
            missing_tools,
            install_plan,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!("{}", run.summary());
        Ok(run)
    }

    /// Requested modules in run order, split into enabled and disabled.
    fn select_modules(&self, selection: &[ToolIdentity]) -> (Vec<ModuleKey>, Vec<ModuleKey>) {
        let wanted: BTreeSet<ToolIdentity> = if selection.is_empty() {
            ToolIdentity::ALL.into_iter().collect()
        } else {
            selection.iter().copied().collect()
        };
        ModuleKey::ALL
            .into_iter()
            .filter(|m| wanted.contains(&m.tool()))
            .partition(|m| self.tools.is_enabled(m.tool()))
    }

    async fn run_module(
        &self,
        module: ModuleKey,
        tool: &ResolvedTool,
        target: &Path,
        output_dir: &Path,
        params: &AnalysisParameters,
        earlier: &[ExecutionResult],
    ) -> ExecutionResult {
        let Some(program) = tool.path.as_deref() else {
            debug!("{} unavailable, not executing {}", tool.command, module);
            return ExecutionResult::new(module, ModuleStatus::NotFound);
        };

        if let Some(reason) = unmet_precondition(module, params, earlier) {
            debug!("Skipping {}: {}", module, reason);
            return ExecutionResult::new(module, ModuleStatus::Skipped { reason });
        }

        if let Some(previous) = modules::owned_output(module, output_dir) {
            if let Err(e) = clear_previous_output(&previous) {
                warn!("Could not clear {} before {}: {}", previous.display(), module, e);
                return ExecutionResult::new(
                    module,
                    ModuleStatus::ToolError {
                        message: format!("could not clear previous output {}: {}", previous.display(), e),
                    },
                );
            }
        }

        let spec = modules::build_command(module, program, target, output_dir, params);
        match self.runner.run(&spec).await {
            Ok(outcome) => {
                let status = ModuleStatus::from(ErrorClassifier::classify_module(module, &outcome));
                let mut result = ExecutionResult::new(module, status);
                result.output = outcome.combined_output;
                result.exit_code = outcome.exit_code;
                result.duration_ms = outcome.duration.as_millis() as u64;
                result
            }
            Err(e) => {
                warn!("Could not start {} for {}: {}", program_name(&spec.program), module, e);
                ExecutionResult::new(module, ErrorClassifier::classify_spawn_error(&e).into())
            }
        }
    }
}

/// Why `module` must not run yet, if anything.
fn unmet_precondition(
    module: ModuleKey,
    params: &AnalysisParameters,
    earlier: &[ExecutionResult],
) -> Option<String> {
    if module != ModuleKey::SteghideExtract {
        return None;
    }
    if params.passphrase.is_none() {
        return Some("no passphrase supplied".to_string());
    }
    let info = earlier.iter().find(|r| r.module == ModuleKey::SteghideInfo);
    match info.map(|r| &r.status) {
        Some(ModuleStatus::Success) => None,
        Some(_) => Some("steghide info did not succeed".to_string()),
        None => Some("steghide info was not run".to_string()),
    }
}

fn clear_previous_output(path: &Path) -> std::io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    debug!("Removing previous output {}", path.display());
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

fn prepare_output_dir(output_dir: &Path, modules: &[ModuleKey]) -> Result<()> {
    let dirs = std::iter::once(output_dir.to_path_buf()).chain(
        modules
            .iter()
            .filter_map(|m| modules::prepared_subdir(*m))
            .map(|sub| output_dir.join(sub)),
    );
    for dir in dirs {
        std::fs::create_dir_all(&dir).map_err(|source| StegoError::OutputDirectory {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}
