use std::path::PathBuf;
use std::time::Duration;

use crate::analyzer::housekeeping::{cleanup_after, sweep_expired};
use crate::config::Config;

pub async fn handle_cleanup(
    config: &Config,
    path: Option<PathBuf>,
    after: u64,
    sweep: bool,
) -> crate::Result<()> {
    if sweep {
        let removed = sweep_expired(&config.paths.upload_dir, config.intake.retention())?;
        for dir in &removed {
            println!("removed {}", dir.display());
        }
        return Ok(());
    }

    // clap guarantees a path whenever --sweep is absent.
    if let Some(path) = path {
        cleanup_after(&path, Duration::from_secs(after)).await?;
    }
    Ok(())
}
