//! Content-addressed staging of an uploaded image.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::types::IntakeConfig;
use crate::error::{IntakeError, Result, StegoError};

const ALLOWED_MIME_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/tiff",
];

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("valid regex"));

/// A validated copy of the upload inside its own checksum directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedUpload {
    pub original_name: String,
    pub checksum: String,
    /// `<upload_dir>/<checksum>`; the pipeline's writable output root.
    pub directory: PathBuf,
    /// `<directory>/<checksum>.<ext>`
    pub path: PathBuf,
    pub extension: String,
    pub mime_type: String,
    pub size: u64,
}

pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// Validate `source` and copy it to `<upload_dir>/<md5>/<md5>.<ext>`.
///
/// An existing directory for the same checksum is replaced, so re-submitting
/// a file always starts from a clean output root.
pub fn stage_upload(source: &Path, config: &IntakeConfig, upload_dir: &Path) -> Result<StagedUpload> {
    let meta = fs::metadata(source)
        .ok()
        .filter(|m| m.is_file())
        .ok_or_else(|| IntakeError::Missing(source.to_path_buf()))?;

    if meta.len() >= config.max_file_size {
        return Err(IntakeError::TooLarge {
            size: meta.len(),
            limit: config.max_file_size,
        }
        .into());
    }

    let original_name = sanitize_file_name(
        &source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let extension = Path::new(&original_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(IntakeError::ExtensionNotAllowed {
            extension,
            allowed: config.allowed_extensions.join(", "),
        }
        .into());
    }

    let bytes = fs::read(source)?;
    let kind = infer::get(&bytes)
        .filter(|k| k.matcher_type() == infer::MatcherType::Image)
        .ok_or(IntakeError::NotAnImage)?;
    if !ALLOWED_MIME_TYPES.contains(&kind.mime_type()) {
        return Err(IntakeError::MimeNotAllowed(kind.mime_type().to_string()).into());
    }

    let checksum = format!("{:x}", md5::compute(&bytes));
    let directory = upload_dir.join(&checksum);
    recreate_dir(&directory)?;

    let path = directory.join(format!("{}.{}", checksum, extension));
    fs::write(&path, &bytes).map_err(|source| StegoError::OutputDirectory {
        path: path.clone(),
        source,
    })?;
    info!("Staged {} as {}", original_name, path.display());

    Ok(StagedUpload {
        original_name,
        checksum,
        directory,
        path,
        extension,
        mime_type: kind.mime_type().to_string(),
        size: meta.len(),
    })
}

fn recreate_dir(dir: &Path) -> Result<()> {
    let wrap = |source: std::io::Error| StegoError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    };
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!("Replaced existing {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(wrap(e)),
    }
    fs::create_dir_all(dir).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0\x1f\x15\xc4\x89";

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn stages_under_checksum_directory() {
        let src = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let file = write(src.path(), "my cat (1).PNG", PNG);

        let staged = stage_upload(&file, &IntakeConfig::default(), uploads.path()).unwrap();
        let checksum = format!("{:x}", md5::compute(PNG));
        assert_eq!(staged.checksum, checksum);
        assert_eq!(staged.original_name, "my_cat__1_.PNG");
        assert_eq!(staged.extension, "png");
        assert_eq!(staged.mime_type, "image/png");
        assert_eq!(staged.path, uploads.path().join(&checksum).join(format!("{}.png", checksum)));
        assert_eq!(fs::read(&staged.path).unwrap(), PNG);
    }

    #[test]
    fn restaging_starts_fresh() {
        let src = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let file = write(src.path(), "a.png", PNG);

        let first = stage_upload(&file, &IntakeConfig::default(), uploads.path()).unwrap();
        fs::create_dir_all(first.directory.join("foremost")).unwrap();
        let second = stage_upload(&file, &IntakeConfig::default(), uploads.path()).unwrap();
        assert_eq!(first.directory, second.directory);
        assert!(!second.directory.join("foremost").exists());
    }

    #[test]
    fn rejects_bad_uploads() {
        let src = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let config = IntakeConfig::default();

        let missing = stage_upload(&src.path().join("nope.png"), &config, uploads.path());
        assert!(matches!(missing, Err(StegoError::Intake(IntakeError::Missing(_)))));

        let text = write(src.path(), "notes.txt", b"hello");
        assert!(matches!(
            stage_upload(&text, &config, uploads.path()),
            Err(StegoError::Intake(IntakeError::ExtensionNotAllowed { .. }))
        ));

        let fake = write(src.path(), "fake.jpg", b"definitely not an image");
        assert!(matches!(
            stage_upload(&fake, &config, uploads.path()),
            Err(StegoError::Intake(IntakeError::NotAnImage))
        ));

        let small = IntakeConfig {
            max_file_size: 8,
            ..IntakeConfig::default()
        };
        let big = write(src.path(), "big.png", PNG);
        assert!(matches!(
            stage_upload(&big, &small, uploads.path()),
            Err(StegoError::Intake(IntakeError::TooLarge { limit: 8, .. }))
        ));
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("ok-name_1.jpg"), "ok-name_1.jpg");
    }
}
