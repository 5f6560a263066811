//! Packport home directory layout
//!
//! Every path the engine touches derives from an explicit root handed to
//! the constructor; nothing in this crate reads the environment.

use std::path::{Path, PathBuf};

/// Root of the packport home directory
#[derive(Debug, Clone)]
pub struct Home(PathBuf);

impl Home {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Repository state directory.
    pub fn repository(&self) -> PathBuf {
        self.0.join("repository")
    }

    /// Path to the repositories.yaml registry file.
    pub fn repository_file(&self) -> PathBuf {
        self.repository().join("repositories.yaml")
    }

    /// Fixed cache root holding one index file per repository.
    pub fn cache(&self) -> PathBuf {
        self.repository().join("cache")
    }

    /// Path to the cached index for the given named repository.
    pub fn cache_index(&self, name: &str) -> PathBuf {
        self.cache().join(format!("{name}-index.yaml"))
    }

    /// Directory of locally installed pack archives.
    pub fn packs(&self) -> PathBuf {
        self.0.join("packs")
    }

    /// Create the directory skeleton, leaving existing content alone.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.repository(), self.cache(), self.packs()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
