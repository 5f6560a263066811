//! Repository registry
//!
//! The durable repositories.yaml file listing every repository the user
//! has configured, with atomic persistence and recovery of the pre-v1
//! flat-map format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{RepoError, Result};
use crate::index::API_VERSION_V1;

/// The repositories.yaml registry file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFile {
    #[serde(default)]
    pub api_version: String,

    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,

    #[serde(default)]
    pub repositories: Vec<Entry>,
}

/// One configured repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique key within the registry
    pub name: String,

    /// Cached index location; relative paths are resolved against the
    /// fixed cache root, never the current directory
    #[serde(default)]
    pub cache: String,

    pub url: String,

    /// Client certificate used only when fetching from this repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
}

/// A registry load, tagged with its advisory condition.
///
/// An out-of-date file was readable and has already been converted; the
/// caller should keep using `file` and re-persist it to clear the
/// condition rather than abort.
#[derive(Debug, Clone)]
pub struct LoadedRepoFile {
    pub file: RepoFile,
    pub out_of_date: bool,
}

impl RepoFile {
    /// Generate an empty registry with the current format tag.
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION_V1.to_string(),
            generated: Utc::now(),
            repositories: Vec::new(),
        }
    }

    /// Load a registry file from disk.
    ///
    /// A file lacking `apiVersion` is reinterpreted as the legacy flat
    /// name-to-URL mapping and converted; the result is flagged
    /// out-of-date. Any other structural failure is a hard error.
    pub fn load_file(path: &Path) -> Result<LoadedRepoFile> {
        let data = std::fs::read_to_string(path).map_err(|e| RepoError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        let file: RepoFile = serde_yaml::from_str(&data)?;
        if !file.api_version.is_empty() {
            return Ok(LoadedRepoFile {
                file,
                out_of_date: false,
            });
        }

        // Either corrupt, or the pre-v1 flat map.
        let legacy: BTreeMap<String, String> = serde_yaml::from_str(&data)?;
        let mut file = RepoFile::new();
        for (name, url) in legacy {
            file.add([Entry {
                cache: format!("{name}-index.yaml"),
                name,
                url,
                ..Default::default()
            }]);
        }
        tracing::warn!(path = %path.display(), "registry file is out of date; converted from legacy format");
        Ok(LoadedRepoFile {
            file,
            out_of_date: true,
        })
    }

    /// Append entries unconditionally; no deduplication.
    pub fn add(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.repositories.extend(entries);
    }

    /// True if the given name is already a repository name.
    pub fn has(&self, name: &str) -> bool {
        self.repositories.iter().any(|e| e.name == name)
    }

    /// Get a repository entry by name.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.repositories.iter().find(|e| e.name == name)
    }

    /// Upsert by name: replace an existing entry in place (preserving its
    /// position) or append when absent.
    pub fn update(&mut self, entries: impl IntoIterator<Item = Entry>) {
        for target in entries {
            match self.repositories.iter_mut().find(|e| e.name == target.name) {
                Some(existing) => *existing = target,
                None => self.repositories.push(target),
            }
        }
    }

    /// Remove a repository entry by name.
    pub fn remove(&mut self, name: &str) -> Result<Entry> {
        let idx = self
            .repositories
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| RepoError::RepoNotFound {
                name: name.to_string(),
            })?;
        Ok(self.repositories.remove(idx))
    }

    /// Write the registry to `path` with the given file mode.
    ///
    /// The write is atomic: the content lands in a temporary file in the
    /// same directory which is then renamed over the destination, so a
    /// crash or concurrent reader never observes a partial registry.
    pub fn write_file(&self, path: &Path, mode: u32) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        set_mode(path, mode)?;
        Ok(())
    }
}

impl Default for RepoFile {
    fn default() -> Self {
        Self::new()
    }
}

fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str, url: &str) -> Entry {
        Entry {
            name: name.to_string(),
            cache: format!("{name}-index.yaml"),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn add_appends_without_deduplication() {
        let mut rf = RepoFile::new();
        rf.add([entry("a", "http://a"), entry("a", "http://a2")]);
        assert_eq!(rf.repositories.len(), 2);
        assert!(rf.has("a"));
        assert!(!rf.has("b"));
    }

    #[test]
    fn update_replaces_in_place() {
        let mut rf = RepoFile::new();
        rf.add([entry("a", "http://a"), entry("b", "http://b")]);

        rf.update([entry("a", "http://a-new")]);
        assert_eq!(rf.repositories.len(), 2);
        assert_eq!(rf.repositories[0].name, "a");
        assert_eq!(rf.repositories[0].url, "http://a-new");

        rf.update([entry("c", "http://c")]);
        assert_eq!(rf.repositories.len(), 3);
        assert_eq!(rf.repositories[2].name, "c");
    }

    #[test]
    fn remove_by_name() {
        let mut rf = RepoFile::new();
        rf.add([entry("a", "http://a"), entry("b", "http://b")]);

        let removed = rf.remove("a").unwrap();
        assert_eq!(removed.url, "http://a");
        assert!(!rf.has("a"));
        assert!(matches!(
            rf.remove("a").unwrap_err(),
            RepoError::RepoNotFound { .. }
        ));
    }

    #[test]
    fn write_then_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");

        let mut rf = RepoFile::new();
        rf.add([entry("testing", "http://example.com/packs")]);
        rf.write_file(&path, 0o644).unwrap();

        let loaded = RepoFile::load_file(&path).unwrap();
        assert!(!loaded.out_of_date);
        assert_eq!(loaded.file.api_version, API_VERSION_V1);
        assert_eq!(loaded.file.repositories, rf.repositories);
    }

    #[test]
    fn legacy_flat_map_is_recovered_and_flagged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");
        std::fs::write(
            &path,
            "testing: http://example.com/packs\nstaging: http://staging.example.com\n",
        )
        .unwrap();

        let loaded = RepoFile::load_file(&path).unwrap();
        assert!(loaded.out_of_date);
        for name in ["testing", "staging"] {
            assert!(loaded.file.has(name));
        }
        let testing = loaded.file.get("testing").unwrap();
        assert_eq!(testing.url, "http://example.com/packs");
        assert_eq!(testing.cache, "testing-index.yaml");

        // Re-persisting clears the condition.
        loaded.file.write_file(&path, 0o644).unwrap();
        assert!(!RepoFile::load_file(&path).unwrap().out_of_date);
    }

    #[test]
    fn load_names_the_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");
        let err = RepoFile::load_file(&path).unwrap_err();
        assert!(matches!(err, RepoError::FileRead { .. }));
        assert!(err.to_string().contains("repositories.yaml"));
    }

    #[test]
    fn corrupt_file_is_a_hard_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");
        std::fs::write(&path, "repositories:\n  - [not, a, mapping]\n").unwrap();
        assert!(RepoFile::load_file(&path).is_err());
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");
        std::fs::write(&path, "garbage that must disappear").unwrap();

        let mut rf = RepoFile::new();
        rf.add([entry("a", "http://a")]);
        rf.write_file(&path, 0o600).unwrap();

        let loaded = RepoFile::load_file(&path).unwrap();
        assert_eq!(loaded.file.repositories.len(), 1);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
