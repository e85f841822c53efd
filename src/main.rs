use clap::Parser;
use std::process;
use stego_sift::{cli::Cli, config, run_command};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> stego_sift::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    let config = config::load_config(cli.config.as_deref())?;

    run_command(cli.command, &config).await
}
