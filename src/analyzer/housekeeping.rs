//! Deferred deletion of run directories.

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime};

use crate::error::Result;

/// Hand `dir` to a detached `cleanup` process that deletes it after
/// `retention`. Returns once the child has been spawned.
pub fn schedule_cleanup(dir: &Path, retention: Duration) -> Result<()> {
    let exe = std::env::current_exe()?;
    let child = Command::new(exe)
        .arg("cleanup")
        .arg(dir)
        .arg("--after")
        .arg(retention.as_secs().to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!(
        "Scheduled removal of {} in {}s (pid {})",
        dir.display(),
        retention.as_secs(),
        child.id()
    );
    Ok(())
}

/// Wait `delay`, then remove `dir`. A directory that is already gone is not
/// an error; the return value says whether anything was removed.
pub async fn cleanup_after(dir: &Path, delay: Duration) -> Result<bool> {
    if !delay.is_zero() {
        debug!("Sleeping {}s before removing {}", delay.as_secs(), dir.display());
        tokio::time::sleep(delay).await;
    }
    Ok(remove_if_present(dir)?)
}

/// Remove checksum directories under `upload_dir` whose modification time is
/// older than `retention`. Returns the removed paths.
pub fn sweep_expired(upload_dir: &Path, retention: Duration) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(upload_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !is_checksum_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_dir() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age >= retention && remove_if_present(&path)? {
            removed.push(path);
        }
    }
    info!("Swept {} expired run directories", removed.len());
    Ok(removed)
}

fn remove_if_present(dir: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!("Removed {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already gone", dir.display());
            Ok(false)
        }
        Err(e) => {
            warn!("Failed to remove {}: {}", dir.display(), e);
            Err(e)
        }
    }
}

fn is_checksum_name(name: &str) -> bool {
    name.len() == 32 && name.bytes().all(|b| b.is_ascii_hexdigit())
}
