use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stego-sift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run steganography and forensics tools against an image and aggregate the results")]
#[command(long_about = "Stages an image under a checksum-named directory, runs a battery of external steganalysis tools (stegoveritas, foremost, steghide, outguess, strings, exiv2, exiftool, binwalk, xxd) against it, and reports their outputs, carved artifacts and any missing tools together with install commands for this host.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an image with the selected tools
    Analyze {
        /// Image to analyze
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Only run these tools (comma separated); all enabled tools by default
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,

        /// steghide passphrase; enables extraction
        #[arg(long, env = "STEGO_SIFT_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// outguess key
        #[arg(long)]
        key: Option<String>,

        /// outguess derivation count (1-100)
        #[arg(long, allow_negative_numbers = true)]
        derivation_count: Option<i64>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Directory in which the checksum-named run directory is created
        #[arg(long, value_name = "DIR")]
        output_root: Option<PathBuf>,

        /// Keep the run directory instead of scheduling its removal
        #[arg(long)]
        no_cleanup: bool,
    },

    /// Check, explain and install the external analysis tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },

    /// Remove a run directory, optionally after a delay, or sweep expired ones
    Cleanup {
        /// Run directory to remove
        #[arg(value_name = "PATH", required_unless_present = "sweep", conflicts_with = "sweep")]
        path: Option<PathBuf>,

        /// Seconds to wait before removing
        #[arg(long, value_name = "SECS", default_value_t = 0)]
        after: u64,

        /// Remove every run directory older than the retention window
        #[arg(long)]
        sweep: bool,
    },
}

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// Probe which tools are available and working
    Status {
        /// Only check these tools
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show install commands for this host's package manager
    Guide {
        /// Only show these tools
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,
    },

    /// Install missing tools with the host package manager (runs sudo)
    Install {
        /// Tools to install; all unavailable tools by default
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Show what would be installed without running anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analyze_options() {
        let cli = Cli::try_parse_from([
            "stego-sift",
            "analyze",
            "cat.png",
            "--tools",
            "steghide,binwalk",
            "--derivation-count",
            "200",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                tools,
                derivation_count,
                format,
                ..
            } => {
                assert_eq!(tools, Some(vec!["steghide".to_string(), "binwalk".to_string()]));
                assert_eq!(derivation_count, Some(200));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn cleanup_needs_path_or_sweep() {
        assert!(Cli::try_parse_from(["stego-sift", "cleanup"]).is_err());
        assert!(Cli::try_parse_from(["stego-sift", "cleanup", "--sweep"]).is_ok());
        assert!(Cli::try_parse_from(["stego-sift", "cleanup", "uploads/x", "--after", "600"]).is_ok());
    }
}
