use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::analyzer::tool_management::{
    AutoInstallRequest, AvailabilityProbe, InstallAdvisor, InstallPlan, ProbeReport, Remediation,
    ToolIdentity, ToolLocator,
};
use crate::cli::{OutputFormat, ToolsCommand};
use crate::config::Config;
use crate::error::StegoError;
use crate::handlers::utils::{indent, parse_tools};

pub async fn handle_tools(config: &Config, command: ToolsCommand) -> crate::Result<()> {
    match command {
        ToolsCommand::Status { tools, format } => handle_tools_status(config, tools, format).await,
        ToolsCommand::Guide { tools } => handle_tools_guide(config, tools),
        ToolsCommand::Install { tools, yes, dry_run } => {
            handle_tools_install(config, tools, yes, dry_run).await
        }
    }
}

fn locator(config: &Config) -> ToolLocator {
    ToolLocator::new(&config.paths.bin_dir)
}

fn advisor(config: &Config) -> InstallAdvisor {
    InstallAdvisor::new(
        locator(config),
        config.execution.install_timeout(),
        config.execution.use_sudo,
    )
}

fn tools_or_all(tools: Vec<ToolIdentity>) -> Vec<ToolIdentity> {
    if tools.is_empty() {
        ToolIdentity::ALL.to_vec()
    } else {
        tools
    }
}

#[derive(Serialize)]
struct StatusEntry<'a> {
    enabled: bool,
    #[serde(flatten)]
    report: &'a ProbeReport,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    tools: BTreeMap<ToolIdentity, StatusEntry<'a>>,
    install_plan: &'a InstallPlan,
}

async fn handle_tools_status(
    config: &Config,
    tools: Option<Vec<String>>,
    format: OutputFormat,
) -> crate::Result<()> {
    let tools = tools_or_all(parse_tools(tools)?);
    let probe = AvailabilityProbe::new(locator(config), config.execution.probe_timeout());
    let reports = probe.probe(tools).await;

    let unavailable = reports.values().filter(|r| !r.available()).map(|r| r.tool);
    let plan = advisor(config).plan_for(unavailable);

    match format {
        OutputFormat::Table => display_status_table(config, &reports, &plan)?,
        OutputFormat::Json => {
            let status = StatusReport {
                tools: reports
                    .iter()
                    .map(|(tool, report)| {
                        let entry = StatusEntry {
                            enabled: config.tools.is_enabled(*tool),
                            report,
                        };
                        (*tool, entry)
                    })
                    .collect(),
                install_plan: &plan,
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

fn display_status_table(
    config: &Config,
    reports: &BTreeMap<ToolIdentity, ProbeReport>,
    plan: &InstallPlan,
) -> crate::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    writeln!(stdout, "Analysis Tools Status")?;
    writeln!(stdout, "{}", "=".repeat(50))?;

    for report in reports.values() {
        let (mark, color) = if report.available() {
            ("✓", Color::Green)
        } else {
            ("✗", Color::Red)
        };
        stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
        write!(stdout, "  {} ", mark)?;
        stdout.reset()?;
        write!(stdout, "{:<30}", report.tool.display_label())?;

        match report.error() {
            None => {
                let version = report.version.as_deref().unwrap_or("unknown version");
                let path = report
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                write!(stdout, " {} ({})", version, path)?;
            }
            Some(error) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                write!(stdout, " {}", error)?;
                stdout.reset()?;
            }
        }
        if !config.tools.is_enabled(report.tool) {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            write!(stdout, " [disabled]")?;
            stdout.reset()?;
        }
        writeln!(stdout)?;
    }

    let available = reports.values().filter(|r| r.available()).count();
    writeln!(stdout, "\n{} of {} tools available.", available, reports.len())?;

    if !plan.is_empty() {
        writeln!(stdout, "\nTo install the missing tools ({}):", plan.package_manager)?;
        print_plan(&mut stdout, plan)?;
    }
    Ok(())
}

fn print_plan(stdout: &mut StandardStream, plan: &InstallPlan) -> crate::Result<()> {
    for (tool, remedy) in &plan.entries {
        write!(stdout, "  {:<14}", tool.as_str())?;
        match remedy {
            Remediation::Command { command } => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
                writeln!(stdout, "{}", command)?;
                stdout.reset()?;
            }
            Remediation::Manual { instructions } => {
                writeln!(stdout, "manual: {}", instructions)?;
            }
        }
    }
    Ok(())
}

fn handle_tools_guide(config: &Config, tools: Option<Vec<String>>) -> crate::Result<()> {
    let tools = tools_or_all(parse_tools(tools)?);
    let plan = advisor(config).plan_for(tools);

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    writeln!(stdout, "Analysis Tools Installation Guide")?;
    writeln!(stdout, "Package manager: {}", plan.package_manager)?;
    writeln!(stdout, "{}", "=".repeat(60))?;
    print_plan(&mut stdout, &plan)?;

    let fallback = locator(config);
    writeln!(
        stdout,
        "\nBinaries placed in {} are used when a tool is not on PATH.",
        fallback.fallback_dir().display()
    )?;
    Ok(())
}

async fn handle_tools_install(
    config: &Config,
    tools: Option<Vec<String>>,
    yes: bool,
    dry_run: bool,
) -> crate::Result<()> {
    let requested = parse_tools(tools)?;
    let targets: BTreeSet<ToolIdentity> = if requested.is_empty() {
        let probe = AvailabilityProbe::new(locator(config), config.execution.probe_timeout());
        probe
            .probe(ToolIdentity::ALL)
            .await
            .into_values()
            .filter(|r| !r.available())
            .map(|r| r.tool)
            .collect()
    } else {
        requested.into_iter().collect()
    };

    if targets.is_empty() {
        println!("All analysis tools are already available.");
        return Ok(());
    }

    let advisor = advisor(config);
    let plan = advisor.plan_for(targets.iter().copied());
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    if dry_run {
        writeln!(stdout, "Dry run: would install with {}:", plan.package_manager)?;
        print_plan(&mut stdout, &plan)?;
        return Ok(());
    }

    writeln!(stdout, "The following commands will be run ({}):", plan.package_manager)?;
    print_plan(&mut stdout, &plan)?;
    if !yes && !confirm_installation()? {
        println!("Installation cancelled.");
        return Ok(());
    }

    let request = AutoInstallRequest {
        tools: targets,
        confirmed: true,
    };
    let report = advisor.install(&request).await?;

    for outcome in &report.outcomes {
        let (mark, color) = if outcome.succeeded {
            ("✓ installed", Color::Green)
        } else {
            ("✗ failed", Color::Red)
        };
        stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
        write!(stdout, "  {:<12}", mark)?;
        stdout.reset()?;
        writeln!(stdout, " {}", outcome.tool)?;
        if !outcome.succeeded && !outcome.output.trim().is_empty() {
            writeln!(stdout, "{}", indent(outcome.output.trim_end(), "      "))?;
        }
    }

    match report.failures().into_iter().next() {
        None => {
            info!("Installed {} tool(s)", report.outcomes.len());
            Ok(())
        }
        Some(first) => Err(StegoError::Install(first)),
    }
}

fn confirm_installation() -> crate::Result<bool> {
    print!("Install the tools above using elevated privileges? [y/N]: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_lowercase().starts_with('y'))
}
