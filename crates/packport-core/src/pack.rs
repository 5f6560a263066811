//! Pack definition, loading, and saving
//!
//! A pack is a directory (or `.tgz` archive) carrying a `Pack.yaml` metadata
//! file plus an arbitrary file tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::archive;
use crate::error::{CoreError, Result};

/// Name of the pack metadata file.
pub const PACK_YAML: &str = "Pack.yaml";

/// Pack metadata as declared in `Pack.yaml`
///
/// The version is kept as a string: repository indexes must tolerate
/// malformed versions instead of refusing to load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    /// Pack name (required)
    pub name: String,

    /// Pack version (SemVer by convention)
    #[serde(default)]
    pub version: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PackMetadata {
    /// Parse metadata from `Pack.yaml` content
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let md: Self = serde_yaml::from_str(yaml)?;
        if md.name.is_empty() {
            return Err(CoreError::InvalidPack {
                message: "name is required".to_string(),
            });
        }
        Ok(md)
    }
}

/// A loaded pack: metadata plus its file tree
#[derive(Debug, Clone, Default)]
pub struct Pack {
    /// Metadata from `Pack.yaml`
    pub metadata: PackMetadata,

    /// Files keyed by slash-separated relative path, `Pack.yaml` excluded
    pub files: BTreeMap<String, Vec<u8>>,
}

impl Pack {
    /// Load a pack from a directory or a `.tgz` archive
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Self::load_dir(path)
        } else if path.is_file() {
            archive::load_archive(path)
        } else {
            Err(CoreError::PackNotFound {
                path: path.display().to_string(),
            })
        }
    }

    fn load_dir(dir: &Path) -> Result<Self> {
        let pack_yaml = dir.join(PACK_YAML);
        if !pack_yaml.is_file() {
            return Err(CoreError::PackNotFound {
                path: dir.display().to_string(),
            });
        }
        let metadata = PackMetadata::from_yaml(&std::fs::read_to_string(&pack_yaml)?)?;

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(|e| CoreError::Archive {
                message: format!("failed to walk {}: {}", dir.display(), e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if rel == PACK_YAML {
                continue;
            }
            files.insert(rel, std::fs::read(entry.path())?);
        }

        Ok(Self { metadata, files })
    }

    /// Save the pack under `dest`, creating `dest` if necessary.
    ///
    /// Fails when `dest` already holds a pack and `overwrite` is false.
    pub fn save(&self, dest: &Path, overwrite: bool) -> Result<()> {
        if dest.join(PACK_YAML).exists() && !overwrite {
            return Err(CoreError::AlreadyExists {
                path: dest.display().to_string(),
            });
        }
        std::fs::create_dir_all(dest)?;

        let yaml = serde_yaml::to_string(&self.metadata)?;
        std::fs::write(dest.join(PACK_YAML), yaml)?;

        for (rel, content) in &self.files {
            let target = dest.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        Ok(())
    }

    /// Rename the pack in place (metadata only).
    pub fn rename(&mut self, name: impl Into<String>) {
        self.metadata.name = name.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test_pack(dir: &Path) {
        std::fs::write(
            dir.join(PACK_YAML),
            "name: python\nversion: 0.1.0\ndescription: Python pack\n",
        )
        .unwrap();
        std::fs::write(dir.join("Dockerfile"), "FROM python:3\n").unwrap();
        std::fs::create_dir_all(dir.join("charts")).unwrap();
        std::fs::write(dir.join("charts").join("app.yaml"), "kind: Deployment\n").unwrap();
    }

    #[test]
    fn load_from_directory() {
        let temp = TempDir::new().unwrap();
        write_test_pack(temp.path());

        let pack = Pack::load(temp.path()).unwrap();
        assert_eq!(pack.metadata.name, "python");
        assert_eq!(pack.metadata.version, "0.1.0");
        assert!(pack.files.contains_key("Dockerfile"));
        assert!(pack.files.contains_key("charts/app.yaml"));
        assert!(!pack.files.contains_key(PACK_YAML));
    }

    #[test]
    fn load_missing_pack_yaml() {
        let temp = TempDir::new().unwrap();
        let err = Pack::load(temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::PackNotFound { .. }));
    }

    #[test]
    fn save_round_trip() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_test_pack(&src);

        let pack = Pack::load(&src).unwrap();
        let dest = temp.path().join("dest");
        pack.save(&dest, false).unwrap();

        let reloaded = Pack::load(&dest).unwrap();
        assert_eq!(reloaded.metadata, pack.metadata);
        assert_eq!(reloaded.files, pack.files);

        // A second save without overwrite must refuse.
        let err = pack.save(&dest, false).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
        pack.save(&dest, true).unwrap();
    }

    #[test]
    fn rename_updates_metadata() {
        let temp = TempDir::new().unwrap();
        write_test_pack(temp.path());

        let mut pack = Pack::load(temp.path()).unwrap();
        pack.rename("snake");
        assert_eq!(pack.metadata.name, "snake");
    }
}
