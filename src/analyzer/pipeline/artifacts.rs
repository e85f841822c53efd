use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analyzer::tool_management::ModuleKey;
use crate::common::format_bytes;

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Other,
}

impl MediaType {
    /// Presentation hint only; decided by extension.
    pub fn from_path(path: &Path) -> Self {
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            MediaType::Image
        } else {
            MediaType::Other
        }
    }
}

/// A file a tool left in the run's output directory. Referenced, never copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub media_type: MediaType,
    pub size: u64,
    pub size_human: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }

    pub fn images(&self) -> impl Iterator<Item = &Artifact> {
        self.iter().filter(|a| a.media_type == MediaType::Image)
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

struct ScanRule {
    patterns: &'static [&'static str],
    skip_empty: bool,
}

fn scan_rule(module: ModuleKey) -> Option<ScanRule> {
    let rule = match module {
        ModuleKey::Foremost => ScanRule {
            patterns: &["foremost/audit.txt", "foremost/*/*"],
            skip_empty: false,
        },
        ModuleKey::Stegoveritas => ScanRule {
            patterns: &["stegoveritas/*"],
            skip_empty: false,
        },
        ModuleKey::SteghideExtract => ScanRule {
            patterns: &["steghide/*"],
            skip_empty: true,
        },
        // outguess creates its output file even when nothing was recovered.
        ModuleKey::Outguess => ScanRule {
            patterns: &["outguess/*"],
            skip_empty: true,
        },
        _ => return None,
    };
    Some(rule)
}

/// Files `module` produced under `output_dir`, in a stable order. Modules
/// without secondary output always yield an empty set.
pub fn scan(module: ModuleKey, output_dir: &Path) -> ArtifactSet {
    let Some(rule) = scan_rule(module) else {
        return ArtifactSet::default();
    };

    let base = glob::Pattern::escape(&output_dir.to_string_lossy());
    let mut artifacts = Vec::new();
    for pattern in rule.patterns {
        let full = format!("{}/{}", base, pattern);
        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                debug!("Bad artifact pattern {}: {}", full, e);
                continue;
            }
        };
        for path in paths.flatten() {
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            if !meta.is_file() || (rule.skip_empty && meta.len() == 0) {
                continue;
            }
            artifacts.push(Artifact {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                media_type: MediaType::from_path(&path),
                size: meta.len(),
                size_human: format_bytes(meta.len()),
                path,
            });
        }
    }
    debug!("{}: {} artifact(s)", module, artifacts.len());
    ArtifactSet { artifacts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn foremost_audit_and_carved_files() {
        let out = TempDir::new().unwrap();
        let root = out.path().join("foremost");
        fs::create_dir_all(root.join("jpg")).unwrap();
        fs::create_dir_all(root.join("zip")).unwrap();
        fs::write(root.join("audit.txt"), "Foremost version 1.5.7\n").unwrap();
        fs::write(root.join("jpg").join("00000000.jpg"), vec![0u8; 2048]).unwrap();
        fs::write(root.join("zip").join("00000012.zip"), b"PK").unwrap();

        let set = scan(ModuleKey::Foremost, out.path());
        let names: Vec<_> = set.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["audit.txt", "00000000.jpg", "00000012.zip"]);
        assert_eq!(set.images().count(), 1);
        let jpg = set.images().next().unwrap();
        assert_eq!(jpg.size, 2048);
        assert_eq!(jpg.size_human, "2 KB");
    }

    #[test]
    fn stegoveritas_skips_directories() {
        let out = TempDir::new().unwrap();
        let root = out.path().join("stegoveritas");
        fs::create_dir_all(root.join("keepers")).unwrap();
        fs::write(root.join("image_Red_0.png"), b"x").unwrap();
        fs::write(root.join("trailing_data.bin"), b"x").unwrap();

        let set = scan(ModuleKey::Stegoveritas, out.path());
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|a| a.path.is_file()));
    }

    #[test]
    fn empty_outguess_output_is_not_an_artifact() {
        let out = TempDir::new().unwrap();
        fs::create_dir_all(out.path().join("outguess")).unwrap();
        fs::write(out.path().join("outguess").join("outguess.out"), b"").unwrap();
        assert!(scan(ModuleKey::Outguess, out.path()).is_empty());
    }

    #[test]
    fn glob_metacharacters_in_output_dir_are_literal() {
        let parent = TempDir::new().unwrap();
        let out = parent.path().join("run[1]");
        fs::create_dir_all(out.join("steghide")).unwrap();
        fs::write(out.join("steghide").join("extracted.bin"), b"secret").unwrap();

        let set = scan(ModuleKey::SteghideExtract, &out);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().media_type, MediaType::Other);
    }

    #[test]
    fn media_type_by_extension() {
        assert_eq!(MediaType::from_path(Path::new("a/B.PNG")), MediaType::Image);
        assert_eq!(MediaType::from_path(Path::new("a/b.tiff")), MediaType::Image);
        assert_eq!(MediaType::from_path(Path::new("a/audit.txt")), MediaType::Other);
        assert_eq!(MediaType::from_path(Path::new("a/noext")), MediaType::Other);
    }
}
