use colored::Colorize;
use log::warn;
use serde::Serialize;
use std::path::PathBuf;

use crate::analyzer::housekeeping::schedule_cleanup;
use crate::analyzer::intake::{stage_upload, StagedUpload};
use crate::analyzer::pipeline::{
    AnalysisParameters, AnalysisPipeline, AnalysisRun, ExecutionResult, MediaType, ModuleStatus,
};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::handlers::utils::{indent, parse_tools, preview};

const BULKY_PREVIEW_LINES: usize = 40;

pub struct AnalyzeOptions {
    pub file: PathBuf,
    pub tools: Option<Vec<String>>,
    pub params: AnalysisParameters,
    pub format: OutputFormat,
    pub output_root: Option<PathBuf>,
    pub no_cleanup: bool,
}

#[derive(Serialize)]
struct AnalysisReport<'a> {
    upload: &'a StagedUpload,
    summary: String,
    total_modules: usize,
    successful_modules: usize,
    #[serde(flatten)]
    run: &'a AnalysisRun,
}

pub async fn handle_analyze(config: &Config, options: AnalyzeOptions) -> crate::Result<()> {
    // Reject bad parameters before anything is written.
    options.params.validate()?;
    let tools = parse_tools(options.tools)?;

    let upload_root = options
        .output_root
        .unwrap_or_else(|| config.paths.upload_dir.clone());
    let staged = stage_upload(&options.file, &config.intake, &upload_root)?;

    let pipeline = AnalysisPipeline::from_config(config);
    let run = pipeline
        .run_analysis(&staged.path, &staged.directory, &tools, &options.params)
        .await?;

    match options.format {
        OutputFormat::Table => display_run_table(&staged, &run),
        OutputFormat::Json => {
            let report = AnalysisReport {
                upload: &staged,
                summary: run.summary(),
                total_modules: run.total_modules(),
                successful_modules: run.successful_modules(),
                run: &run,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if !options.no_cleanup {
        if let Err(e) = schedule_cleanup(&run.output_dir, config.intake.retention()) {
            warn!("Could not schedule cleanup of {}: {}", run.output_dir.display(), e);
        }
    }
    Ok(())
}

fn display_run_table(staged: &StagedUpload, run: &AnalysisRun) {
    println!(
        "{} {} ({}, {})",
        "Analysis of".bold(),
        staged.original_name.bold(),
        staged.mime_type,
        crate::common::format_bytes(staged.size)
    );
    println!("  Checksum:   {}", staged.checksum);
    println!("  Output dir: {}", run.output_dir.display());
    println!("{}", "=".repeat(60));

    for result in &run.results {
        display_result(result);
    }

    if !run.disabled_modules.is_empty() {
        let names: Vec<_> = run.disabled_modules.iter().map(|m| m.as_str()).collect();
        println!("\n{} {}", "Disabled in configuration:".dimmed(), names.join(", "));
    }

    if !run.missing_tools.is_empty() {
        println!("\n{}", "Missing tools".red().bold());
        println!("  Package manager: {}", run.install_plan.package_manager);
        for tool in &run.missing_tools {
            let cause = run
                .results
                .iter()
                .find(|r| r.tool == *tool && r.status.is_unavailable())
                .and_then(|r| r.error.clone())
                .unwrap_or_default();
            println!("  {} {}", "✗".red(), cause);
            if let Some(remedy) = run.install_plan.get(*tool) {
                println!("      {}", remedy.text().cyan());
            }
        }
        println!("  Run 'stego-sift tools install' to install them.");
    }

    println!("\n{}", run.summary().bold());
}

fn display_result(result: &ExecutionResult) {
    let status = match &result.status {
        ModuleStatus::Success => result.status.label().green(),
        ModuleStatus::Skipped { .. } => result.status.label().yellow(),
        _ => result.status.label().red(),
    };
    println!("\n{} [{}]", result.module.display_label().bold(), status);

    if let Some(error) = &result.error {
        println!("  {}", error);
    }

    let output = result.output.trim_end();
    if !output.is_empty() && !result.status.is_unavailable() {
        let shown = if result.module.is_bulky() {
            preview(output, BULKY_PREVIEW_LINES)
        } else {
            output.to_string()
        };
        println!("{}", indent(&shown, "  "));
    }

    if !result.artifacts.is_empty() {
        println!("  {} ({})", "Artifacts".bold(), result.artifacts.len());
        for artifact in &result.artifacts {
            let kind = match artifact.media_type {
                MediaType::Image => "image",
                MediaType::Other => "file",
            };
            println!(
                "    - {} [{}, {}] {}",
                artifact.file_name,
                kind,
                artifact.size_human,
                artifact.path.display().to_string().dimmed()
            );
        }
    }
}
