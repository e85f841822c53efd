use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::catalog::ToolIdentity;
use super::detector::ToolLocator;
use super::installers::{manual_instructions, recipe_for, InstallRecipe, PackageManagerKind};
use crate::common::command_utils::{program_name, CommandRunner, CommandSpec};
use crate::error::InstallError;

/// What an operator should do about one missing tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Remediation {
    Command { command: String },
    Manual { instructions: String },
}

impl Remediation {
    pub fn text(&self) -> &str {
        match self {
            Remediation::Command { command } => command,
            Remediation::Manual { instructions } => instructions,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Remediation::Command { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPlan {
    pub package_manager: PackageManagerKind,
    pub entries: BTreeMap<ToolIdentity, Remediation>,
}

impl InstallPlan {
    pub fn get(&self, tool: ToolIdentity) -> Option<&Remediation> {
        self.entries.get(&tool)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the plan for a known manager without touching the host.
    pub fn for_manager(
        package_manager: PackageManagerKind,
        tools: impl IntoIterator<Item = ToolIdentity>,
    ) -> Self {
        let entries = tools
            .into_iter()
            .map(|tool| {
                let remediation = match recipe_for(tool, package_manager) {
                    Some(recipe) => Remediation::Command {
                        command: recipe.display_command(),
                    },
                    None => Remediation::Manual {
                        instructions: manual_instructions(tool).to_string(),
                    },
                };
                (tool, remediation)
            })
            .collect();
        Self {
            package_manager,
            entries,
        }
    }
}

/// Operator request to install tools on this host.
#[derive(Debug, Clone)]
pub struct AutoInstallRequest {
    pub tools: BTreeSet<ToolIdentity>,
    /// Must be set by an explicit operator action.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoInstallOutcome {
    pub tool: ToolIdentity,
    pub succeeded: bool,
    /// The command as shown to the operator.
    pub command: String,
    pub output: String,
}

impl AutoInstallOutcome {
    pub fn into_error(self) -> Option<InstallError> {
        if self.succeeded {
            return None;
        }
        Some(InstallError::AutoInstallFailed {
            tool: self.tool,
            reason: last_meaningful_line(&self.output)
                .unwrap_or_else(|| "tool still not found after installation".to_string()),
            output: self.output,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoInstallReport {
    pub package_manager: PackageManagerKind,
    pub outcomes: Vec<AutoInstallOutcome>,
}

impl AutoInstallReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    pub fn failures(&self) -> Vec<InstallError> {
        self.outcomes
            .iter()
            .cloned()
            .filter_map(AutoInstallOutcome::into_error)
            .collect()
    }
}

/// Detects the host package manager and turns missing tools into install
/// commands. Auto-install is only reachable through [`InstallAdvisor::install`].
#[derive(Debug, Clone)]
pub struct InstallAdvisor {
    locator: ToolLocator,
    runner: CommandRunner,
    use_sudo: bool,
}

impl InstallAdvisor {
    pub fn new(locator: ToolLocator, install_timeout: Option<Duration>, use_sudo: bool) -> Self {
        Self {
            locator,
            runner: CommandRunner::new(install_timeout),
            use_sudo,
        }
    }

    /// First manager in [`PackageManagerKind::DETECTION_ORDER`] whose query
    /// command resolves.
    pub fn detect_package_manager(&self) -> PackageManagerKind {
        for manager in PackageManagerKind::DETECTION_ORDER {
            // Recipes invoke the query command itself, so only it counts.
            let found = manager
                .query_command()
                .map(|cmd| self.locator.is_available(cmd))
                .unwrap_or(false);
            if found {
                debug!("Detected package manager: {}", manager);
                return manager;
            }
        }
        debug!("No known package manager detected");
        PackageManagerKind::Unknown
    }

    pub fn plan_for(&self, tools: impl IntoIterator<Item = ToolIdentity>) -> InstallPlan {
        InstallPlan::for_manager(self.detect_package_manager(), tools)
    }

    /// Run the confirmed request, one tool at a time. A failing tool is
    /// reported in the outcome list and does not stop the others.
    pub async fn install(
        &self,
        request: &AutoInstallRequest,
    ) -> Result<AutoInstallReport, InstallError> {
        if !request.confirmed {
            return Err(InstallError::ConfirmationRequired);
        }
        let manager = self.detect_package_manager();
        if manager == PackageManagerKind::Unknown {
            return Err(InstallError::PlanUnavailable);
        }

        let mut outcomes = Vec::with_capacity(request.tools.len());
        for &tool in &request.tools {
            let recipe = recipe_for(tool, manager).ok_or(InstallError::NoCommand(tool))?;
            outcomes.push(self.run_recipe(tool, &recipe).await);
        }
        Ok(AutoInstallReport {
            package_manager: manager,
            outcomes,
        })
    }

    /// Install a single tool. Callers are responsible for having obtained
    /// operator confirmation first.
    pub async fn attempt_auto_install(
        &self,
        tool: ToolIdentity,
    ) -> Result<AutoInstallOutcome, InstallError> {
        let manager = self.detect_package_manager();
        if manager == PackageManagerKind::Unknown {
            return Err(InstallError::PlanUnavailable);
        }
        let recipe = recipe_for(tool, manager).ok_or(InstallError::NoCommand(tool))?;
        Ok(self.run_recipe(tool, &recipe).await)
    }

    async fn run_recipe(&self, tool: ToolIdentity, recipe: &InstallRecipe) -> AutoInstallOutcome {
        let elevate = self.use_sudo && recipe.manager.needs_root();
        let command = if elevate {
            recipe.display_command()
        } else {
            recipe
                .steps
                .iter()
                .map(|s| s.join(" "))
                .collect::<Vec<_>>()
                .join(" && ")
        };
        info!("Installing {} with: {}", tool, command);

        let mut output = String::new();
        let mut steps_ok = true;
        for step in &recipe.steps {
            let spec = match self.step_spec(step, elevate) {
                Some(spec) => spec,
                None => {
                    let missing = if elevate { "sudo" } else { step[0].as_str() };
                    output.push_str(&format!("{}: command not found\n", missing));
                    steps_ok = false;
                    break;
                }
            };
            match self.runner.run(&spec).await {
                Ok(outcome) => {
                    output.push_str(&outcome.combined_output);
                    if outcome.timed_out {
                        output.push_str("installation step timed out\n");
                        steps_ok = false;
                        break;
                    }
                    if outcome.exit_code != Some(0) {
                        steps_ok = false;
                        break;
                    }
                }
                Err(e) => {
                    output.push_str(&format!("failed to start {}: {}\n", program_name(&spec.program), e));
                    steps_ok = false;
                    break;
                }
            }
        }

        let succeeded = self.locator.locate(tool).available();
        if succeeded {
            info!("{} installed successfully", tool);
        } else {
            warn!("Installing {} did not make it available (steps ok: {})", tool, steps_ok);
        }
        AutoInstallOutcome {
            tool,
            succeeded,
            command,
            output,
        }
    }

    fn step_spec(&self, step: &[String], elevate: bool) -> Option<CommandSpec> {
        let (head, rest) = step.split_first()?;
        if elevate {
            let (sudo, _) = self.locator.resolve_command("sudo")?;
            // -n: fail instead of prompting for a password on a non-tty.
            return Some(CommandSpec::new(sudo).arg("-n").args(step));
        }
        let (program, _) = self.locator.resolve_command(head)?;
        Some(CommandSpec::new(program).args(rest))
    }
}

fn last_meaningful_line(output: &str) -> Option<String> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
