//! Repository index model
//!
//! The catalog of published pack versions for one repository: parsing,
//! querying under a version constraint, merging, and serialization.

use chrono::{DateTime, Utc};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use packport_core::PackMetadata;

use crate::downloader::is_tar;
use crate::error::{RepoError, Result};
use crate::urlutil;

/// The v1 API version for index and registry files.
pub const API_VERSION_V1: &str = "v1";

/// A repository's index file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    /// Format tag; required on load, no silent default
    #[serde(default)]
    pub api_version: String,

    /// When this index was generated (informational)
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,

    /// Pack versions keyed by name
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<PackVersion>>,

    /// Public keys accepted for signatures in this repository
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_keys: Vec<String>,
}

impl IndexFile {
    /// Initialize an empty index.
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION_V1.to_string(),
            generated: Utc::now(),
            entries: BTreeMap::new(),
            public_keys: Vec::new(),
        }
    }

    /// Parse an index with minimal validity checking.
    ///
    /// Fails with [`RepoError::NoApiVersion`] when the version tag is
    /// absent; unlike the registry there is no legacy-recovery path.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(data).map_err(|e| RepoError::InvalidIndex {
            message: format!("not valid UTF-8: {e}"),
        })?;
        let index: Self = serde_yaml::from_str(yaml)?;
        if index.api_version.is_empty() {
            return Err(RepoError::NoApiVersion);
        }
        Ok(index)
    }

    /// Load an index file from disk.
    pub fn load_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| RepoError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_bytes(&data)
    }

    /// Write the index to `dest` with the given file mode.
    pub fn write_file(&self, dest: &Path, mode: u32) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(dest, yaml)?;
        set_mode(dest, mode)?;
        Ok(())
    }

    /// Add a file to the index.
    ///
    /// The entry's primary URL is `base_url` joined with the final segment
    /// of `filename`, or `filename` verbatim when `base_url` is empty.
    /// This can leave the index in an unsorted state.
    pub fn add(&mut self, metadata: PackMetadata, filename: &str, base_url: &str, digest: &str) {
        let url = if base_url.is_empty() {
            filename.to_string()
        } else {
            let file = Path::new(filename)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| filename.to_string());
            urlutil::join(base_url, &file)
        };
        let name = metadata.name.clone();
        let version = PackVersion {
            metadata,
            urls: vec![url],
            created: Some(Utc::now()),
            removed: false,
            digest: if digest.is_empty() {
                None
            } else {
                Some(digest.to_string())
            },
        };
        self.entries.entry(name).or_default().push(version);
    }

    /// Sort every entry's version list in descending version order.
    ///
    /// In canonical form the most recent release sits in slot 0, so
    /// tooling can pick the newest version without parsing SemVers.
    /// Unparsable versions sort after every parsable one. Idempotent.
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            versions.sort_by(|a, b| {
                match (Version::parse(a.version()), Version::parse(b.version())) {
                    (Ok(va), Ok(vb)) => vb.cmp(&va),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => Ordering::Equal,
                }
            });
        }
    }

    /// Get the first version of `name` satisfying `constraint`.
    ///
    /// An empty constraint means "any version". A bare version string is
    /// an exact match; anything else is parsed as a semver range. Entries
    /// whose own version fails to parse are skipped, and iteration follows
    /// the current (possibly unsorted) order: callers wanting the latest
    /// release must sort first.
    pub fn get(&self, name: &str, constraint: &str) -> Result<&PackVersion> {
        let versions = self.entries.get(name).ok_or_else(|| RepoError::NoPackName {
            name: name.to_string(),
        })?;
        if versions.is_empty() {
            return Err(RepoError::NoPackVersion {
                name: name.to_string(),
            });
        }

        enum Want {
            Any,
            Exact(Version),
            Range(VersionReq),
        }
        let want = if constraint.is_empty() {
            Want::Any
        } else if let Ok(v) = Version::parse(constraint) {
            Want::Exact(v)
        } else {
            Want::Range(VersionReq::parse(constraint).map_err(|e| {
                RepoError::InvalidConstraint {
                    constraint: constraint.to_string(),
                    message: e.to_string(),
                }
            })?)
        };

        for pv in versions {
            let Ok(v) = Version::parse(pv.version()) else {
                continue;
            };
            let hit = match &want {
                Want::Any => true,
                Want::Exact(exact) => v == *exact,
                Want::Range(req) => req.matches(&v),
            };
            if hit {
                return Ok(pv);
            }
        }
        Err(RepoError::NoMatchingVersion {
            name: name.to_string(),
            constraint: constraint.to_string(),
        })
    }

    /// True if the index has an entry for `name` at exactly `version`.
    pub fn has(&self, name: &str, version: &str) -> bool {
        self.get(name, version).is_ok()
    }

    /// Merge another index into this one, by name and version.
    ///
    /// Pairs absent from the receiver are appended; existing records are
    /// preserved untouched, including soft-deleted ones. This can leave
    /// the index in an unsorted state.
    pub fn merge(&mut self, other: &IndexFile) {
        for versions in other.entries.values() {
            for pv in versions {
                if !self.has(pv.name(), pv.version()) {
                    self.entries
                        .entry(pv.name().to_string())
                        .or_default()
                        .push(pv.clone());
                }
            }
        }
    }
}

impl Default for IndexFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan a directory (non-recursive) of `.tgz` archives into an index.
///
/// Files that fail to load as packs are assumed not to be packs and are
/// skipped; the scan never aborts on them. The result is unsorted.
pub fn index_directory(dir: &Path, base_url: &str) -> Result<IndexFile> {
    let mut index = IndexFile::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(fname) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        if !is_tar(fname) {
            continue;
        }
        let metadata = match packport_core::load_metadata(&path) {
            Ok(md) => md,
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "skipping non-pack file");
                continue;
            }
        };
        let digest = packport_core::digest_file(&path)?;
        let fname = fname.to_string();
        index.add(metadata, &fname, base_url, &digest);
    }
    Ok(index)
}

/// One published pack release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackVersion {
    /// Declared pack metadata
    #[serde(flatten)]
    pub metadata: PackMetadata,

    /// Fetch locations, first preferred
    #[serde(default)]
    pub urls: Vec<String>,

    /// Publication timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Soft-delete flag; never physically pruned by merge
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,

    /// SHA256 digest of the archive, used for post-download integrity
    /// comparison (not a signature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl PackVersion {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// The preferred download URL.
    pub fn download_url(&self) -> Option<&str> {
        self.urls.first().map(|s| s.as_str())
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
