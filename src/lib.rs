//! # stego-sift
//!
//! Orchestrates external steganography and forensics tools against an
//! uploaded image and aggregates their results.
//!
//! ## Features
//!
//! - **Tool resolution**: search path first, then a local `bin` fallback directory
//! - **Safe execution**: argument vectors only, user input never reaches a shell
//! - **Failure taxonomy**: missing tool vs. missing shared library vs. tool error
//! - **Install advice**: per package manager commands, plus an operator-only installer
//! - **Artifacts**: files carved or extracted by the tools are discovered and reported
//!
//! ## Example
//!
//! ```rust,no_run
//! use stego_sift::analyzer::{AnalysisParameters, AnalysisPipeline, ToolIdentity, ToolLocator};
//! use std::path::Path;
//!
//! # async fn demo() -> stego_sift::Result<()> {
//! let pipeline = AnalysisPipeline::new(ToolLocator::default(), None);
//! let run = pipeline
//!     .run_analysis(
//!         Path::new("uploads/abc/abc.png"),
//!         Path::new("uploads/abc"),
//!         &[ToolIdentity::Steghide, ToolIdentity::Binwalk],
//!         &AnalysisParameters::default(),
//!     )
//!     .await?;
//! println!("{}", run.summary());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod common;
pub mod config;
pub mod error;
pub mod handlers;

pub use analyzer::{AnalysisPipeline, AnalysisRun};
pub use error::{Result, StegoError};
use analyzer::pipeline::AnalysisParameters;
use cli::Commands;
use config::Config;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn run_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Analyze {
            file,
            tools,
            passphrase,
            key,
            derivation_count,
            format,
            output_root,
            no_cleanup,
        } => {
            let options = handlers::AnalyzeOptions {
                file,
                tools,
                params: AnalysisParameters {
                    passphrase,
                    key,
                    derivation_count,
                },
                format,
                output_root,
                no_cleanup,
            };
            handlers::handle_analyze(config, options).await
        }
        Commands::Tools { command } => handlers::handle_tools(config, command).await,
        Commands::Cleanup { path, after, sweep } => {
            handlers::handle_cleanup(config, path, after, sweep).await
        }
    }
}
