//! Repository client
//!
//! Wraps one registry entry plus a transport and fetches that
//! repository's index, either into the local cache or transiently for
//! one-off lookups.

use futures::future::join_all;
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};
use crate::getter::{Getter, GetterOptions, Providers};
use crate::home::Home;
use crate::index::IndexFile;
use crate::registry::{Entry, RepoFile};

/// A client for one configured pack repository
pub struct PackRepository {
    pub config: Entry,
    client: Box<dyn Getter>,
}

impl std::fmt::Debug for PackRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackRepository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PackRepository {
    /// Construct a client, validating the entry's URL.
    ///
    /// A URL whose scheme has no registered transport handler is a hard
    /// configuration error.
    pub fn new(config: Entry, getters: &Providers) -> Result<Self> {
        let url = url::Url::parse(&config.url).map_err(|e| RepoError::InvalidUrl {
            url: config.url.clone(),
            message: e.to_string(),
        })?;
        let constructor = getters.by_scheme(url.scheme())?;
        let client = constructor(&GetterOptions::from_entry(&config))?;
        Ok(Self { config, client })
    }

    /// The URL of this repository's index file.
    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.config.url.trim_end_matches('/'))
    }

    /// Fetch and parse the repository's index without touching the cache.
    pub async fn fetch_index(&self) -> Result<IndexFile> {
        IndexFile::from_bytes(&self.fetch_index_bytes().await?)
    }

    async fn fetch_index_bytes(&self) -> Result<Vec<u8>> {
        let index_url = self.index_url();
        tracing::debug!(repo = %self.config.name, url = %index_url, "fetching repository index");
        self.client.get(&index_url).await
    }

    /// Fetch the index and write the raw bytes to this entry's cache path.
    ///
    /// The fetched document must parse as a valid index before anything is
    /// written. A relative cache path is resolved against `cache_root`;
    /// absolute paths (a compatibility wart from older registries) are
    /// kept as-is. Returns the path written.
    pub async fn download_index_file(&self, cache_root: &Path) -> Result<PathBuf> {
        let body = self.fetch_index_bytes().await?;
        IndexFile::from_bytes(&body)?;

        let cache = Path::new(&self.config.cache);
        let target = if cache.is_absolute() {
            cache.to_path_buf()
        } else {
            cache_root.join(cache)
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &body)?;
        tracing::debug!(repo = %self.config.name, cache = %target.display(), "wrote index cache");
        Ok(target)
    }
}

/// Find a pack in the repository at `repo_url` without persisting the
/// repository: fetch its index transiently and return the matched entry's
/// preferred URL.
pub async fn find_pack_in_repo_url(
    repo_url: &str,
    name: &str,
    version: &str,
    options: &GetterOptions,
    getters: &Providers,
) -> Result<String> {
    let entry = Entry {
        name: String::new(),
        cache: String::new(),
        url: repo_url.to_string(),
        cert_file: options.cert_file.clone(),
        key_file: options.key_file.clone(),
        ca_file: options.ca_file.clone(),
    };
    let repo = PackRepository::new(entry, getters)?;
    let index = repo.fetch_index().await.map_err(|e| {
        tracing::debug!(url = %repo_url, error = %e, "repository index fetch failed");
        RepoError::InvalidRepo {
            repo_url: repo_url.to_string(),
            message: e.to_string(),
        }
    })?;

    let described = if version.is_empty() {
        format!("pack {name:?}")
    } else {
        format!("pack {name:?} version {version:?}")
    };
    let pv = index
        .get(name, version)
        .map_err(|_| RepoError::NotFoundInRepo {
            name: described.clone(),
            repo_url: repo_url.to_string(),
        })?;
    pv.download_url()
        .map(str::to_string)
        .ok_or_else(|| RepoError::NoDownloadUrls {
            name: described,
        })
}

/// Outcome of refreshing one repository's cache
pub struct RefreshOutcome {
    pub name: String,
    pub url: String,
    pub result: Result<PathBuf>,
}

/// Refresh every configured repository's cached index in parallel.
///
/// One independent task per repository; the caller blocks until all
/// complete. A failure is reported per repository and never cancels or
/// affects sibling tasks.
pub async fn refresh_all(
    repo_file: &RepoFile,
    home: &Home,
    getters: &Providers,
) -> Vec<RefreshOutcome> {
    let cache_root = home.cache();
    let tasks: Vec<_> = repo_file
        .repositories
        .iter()
        .cloned()
        .map(|entry| {
            let getters = getters.clone();
            let cache_root = cache_root.clone();
            tokio::spawn(async move {
                let name = entry.name.clone();
                let url = entry.url.clone();
                let result = match PackRepository::new(entry, &getters) {
                    Ok(repo) => repo.download_index_file(&cache_root).await,
                    Err(e) => Err(e),
                };
                RefreshOutcome { name, url, result }
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(tasks.len());
    for joined in join_all(tasks).await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => RefreshOutcome {
                name: String::new(),
                url: String::new(),
                result: Err(RepoError::Network {
                    message: format!("refresh task failed: {e}"),
                }),
            },
        };
        match &outcome.result {
            Ok(path) => {
                tracing::info!(repo = %outcome.name, cache = %path.display(), "index refreshed")
            }
            Err(e) => tracing::warn!(repo = %outcome.name, error = %e, "index refresh failed"),
        }
        outcomes.push(outcome);
    }
    outcomes
}
