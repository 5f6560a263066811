//! Reference resolution and pack download
//!
//! Turns a human-given reference (local path, full URL, `repo/name`, or a
//! bare name) plus an optional version constraint into a verified local
//! archive.

use std::path::{Path, PathBuf};
use url::Url;

use packport_core::{digest_bytes, digest_matches, signature_path, verify_pack, Verification};

use crate::client;
use crate::error::{RepoError, Result};
use crate::getter::{GetterOptions, Providers};
use crate::home::Home;
use crate::index::IndexFile;
use crate::registry::{Entry, RepoFile};
use crate::urlutil;

/// When to verify a downloaded archive.
///
/// A policy value rather than a boolean: "skip", "verify opportunistically",
/// "fetch the signature for later", and "verify or fail" are all
/// operationally distinct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerifyPolicy {
    /// Never verify, never fetch signatures
    #[default]
    Never,
    /// Verify when a signature is published; a missing signature is fine,
    /// a failing one is not
    IfPossible,
    /// Fetch and store the signature next to the archive, but do not
    /// verify now
    Later,
    /// Verification is required; a missing signature or a failure aborts
    Always,
}

impl VerifyPolicy {
    fn wants_signature(self) -> bool {
        self != VerifyPolicy::Never
    }
}

/// What a reference resolved to
#[derive(Debug)]
pub enum ResolvedRef {
    /// An existing local file or directory
    Local {
        path: PathBuf,
        verification: Option<Verification>,
    },
    /// A concrete remote URL, possibly attributed to a configured
    /// repository (whose client-cert material the fetch must use) and
    /// possibly carrying the index's expected digest
    Remote {
        url: Url,
        digest: Option<String>,
        repo: Option<Entry>,
    },
}

/// Resolves references and downloads pack archives
pub struct Downloader {
    pub home: Home,
    pub verify: VerifyPolicy,
    /// Public key file used for signature verification
    pub keyring: Option<PathBuf>,
    /// Explicit repository URL override: bare names are resolved against
    /// this repository directly, bypassing the registry
    pub repo_url: Option<String>,
    pub getters: Providers,
}

impl Downloader {
    pub fn new(home: Home, getters: Providers) -> Self {
        Self {
            home,
            verify: VerifyPolicy::default(),
            keyring: None,
            repo_url: None,
            getters,
        }
    }

    /// Resolve `reference` under the optional version `constraint`
    /// (empty string means "any version").
    pub async fn resolve(&self, reference: &str, constraint: &str) -> Result<ResolvedRef> {
        // Existing filesystem entries win over every other interpretation.
        let as_path = Path::new(reference);
        if as_path.exists() {
            return self.resolve_local(as_path);
        }

        // A path-shaped reference that does not exist is never treated as
        // a repository-relative name; typo'd paths must not reach the
        // network.
        if as_path.is_absolute() || reference.starts_with('.') {
            return Err(RepoError::RefNotFound {
                reference: reference.to_string(),
            });
        }

        // Full URLs resolve to themselves, verbatim.
        if let Ok(url) = Url::parse(reference) {
            if !self.getters.supports(url.scheme()) {
                return Err(RepoError::UnknownScheme {
                    scheme: url.scheme().to_string(),
                });
            }
            let repo = self.owner_repo(reference)?;
            return Ok(ResolvedRef::Remote {
                url,
                digest: None,
                repo,
            });
        }

        // repo/name references go through the registry and the cached index.
        if let Some((repo_name, pack_name)) = reference.split_once('/') {
            let registry = RepoFile::load_file(&self.home.repository_file())?.file;
            let entry = registry
                .get(repo_name)
                .ok_or_else(|| RepoError::RepoNotFound {
                    name: repo_name.to_string(),
                })?
                .clone();
            let index = IndexFile::load_file(&self.home.cache_index(repo_name)).map_err(|e| {
                RepoError::NoCachedIndex {
                    name: repo_name.to_string(),
                    message: e.to_string(),
                }
            })?;
            let pv = index.get(pack_name, constraint)?;
            let raw = pv.download_url().ok_or_else(|| RepoError::NoDownloadUrls {
                name: pack_name.to_string(),
            })?;
            // Index entries may publish URLs relative to the repository.
            let url = match Url::parse(raw) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    Url::parse(&urlutil::join(&entry.url, raw)).map_err(|e| {
                        RepoError::InvalidUrl {
                            url: raw.to_string(),
                            message: e.to_string(),
                        }
                    })?
                }
                Err(e) => {
                    return Err(RepoError::InvalidUrl {
                        url: raw.to_string(),
                        message: e.to_string(),
                    })
                }
            };
            return Ok(ResolvedRef::Remote {
                url,
                digest: pv.digest.clone(),
                repo: Some(entry),
            });
        }

        // Bare name: an archive already present under the home's packs
        // directory short-circuits any network lookup.
        for candidate in [
            self.home.packs().join(reference),
            self.home.packs().join(format!("{reference}.tgz")),
        ] {
            if candidate.exists() {
                return self.resolve_local(&candidate);
            }
        }

        // Last resort: an explicit repository URL override, queried
        // directly without persisting anything.
        if let Some(repo_url) = &self.repo_url {
            let found = client::find_pack_in_repo_url(
                repo_url,
                reference,
                constraint,
                &GetterOptions::default(),
                &self.getters,
            )
            .await?;
            let url = Url::parse(&found).map_err(|e| RepoError::InvalidUrl {
                url: found.clone(),
                message: e.to_string(),
            })?;
            return Ok(ResolvedRef::Remote {
                url,
                digest: None,
                repo: None,
            });
        }

        Err(RepoError::RefNotFound {
            reference: reference.to_string(),
        })
    }

    fn resolve_local(&self, path: &Path) -> Result<ResolvedRef> {
        let path = path.canonicalize()?;
        let verification = if self.verify == VerifyPolicy::Always {
            if path.is_dir() {
                return Err(RepoError::CannotVerifyDirectory {
                    path: path.display().to_string(),
                });
            }
            let keyring = self.keyring.as_deref().ok_or(RepoError::NoKeyring)?;
            Some(verify_pack(&path, keyring)?)
        } else {
            None
        };
        Ok(ResolvedRef::Local { path, verification })
    }

    /// Attribute a URL to a configured repository, so the fetch can use
    /// that repository's client-cert material. A missing registry file
    /// simply means no attribution.
    fn owner_repo(&self, url: &str) -> Result<Option<Entry>> {
        let registry_path = self.home.repository_file();
        if !registry_path.exists() {
            return Ok(None);
        }
        let registry = RepoFile::load_file(&registry_path)?.file;
        match self.scan_repos_for_url(url, &registry) {
            Ok(entry) => Ok(Some(entry.clone())),
            Err(RepoError::NoOwnerRepo { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reverse lookup: find the configured repository whose index lists
    /// `url` among its entries' download URLs. First match wins; no match
    /// across all repositories is the distinguished
    /// [`RepoError::NoOwnerRepo`].
    pub fn scan_repos_for_url<'a>(&self, url: &str, registry: &'a RepoFile) -> Result<&'a Entry> {
        for entry in &registry.repositories {
            let index = IndexFile::load_file(&self.home.cache_index(&entry.name)).map_err(|e| {
                RepoError::NoCachedIndex {
                    name: entry.name.clone(),
                    message: e.to_string(),
                }
            })?;
            for versions in index.entries.values() {
                for pv in versions {
                    if pv.urls.iter().any(|u| urlutil::equal(u, url)) {
                        return Ok(entry);
                    }
                }
            }
        }
        Err(RepoError::NoOwnerRepo {
            url: url.to_string(),
        })
    }

    /// Resolve `reference`, fetch the archive, verify it according to
    /// policy, and place it in `dest` under the URL's basename.
    ///
    /// Returns the final path plus the verification record, if one was
    /// produced.
    pub async fn download_to(
        &self,
        reference: &str,
        constraint: &str,
        dest: &Path,
    ) -> Result<(PathBuf, Option<Verification>)> {
        let (url, expected_digest, repo) = match self.resolve(reference, constraint).await? {
            ResolvedRef::Local { path, verification } => return Ok((path, verification)),
            ResolvedRef::Remote { url, digest, repo } => (url, digest, repo),
        };

        let constructor = self.getters.by_scheme(url.scheme())?;
        let options = repo
            .as_ref()
            .map(GetterOptions::from_entry)
            .unwrap_or_default();
        let client = constructor(&options)?;

        tracing::debug!(url = %url, "downloading pack archive");
        let data = client.get(url.as_str()).await?;

        if let Some(expected) = &expected_digest {
            let actual = digest_bytes(&data);
            if !digest_matches(expected, &actual) {
                return Err(RepoError::DigestMismatch {
                    url: url.to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let name = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RepoError::InvalidUrl {
                url: url.to_string(),
                message: "no filename in URL path".to_string(),
            })?;
        let target = dest.join(name);
        std::fs::write(&target, &data)?;

        let verification = if self.verify.wants_signature() {
            self.fetch_and_verify(client.as_ref(), &url, &target).await?
        } else {
            None
        };

        Ok((target, verification))
    }

    async fn fetch_and_verify(
        &self,
        client: &dyn crate::getter::Getter,
        url: &Url,
        archive: &Path,
    ) -> Result<Option<Verification>> {
        let sig_url = format!("{url}.minisig");
        match client.get(&sig_url).await {
            Ok(signature) => {
                std::fs::write(signature_path(archive), signature)?;
            }
            Err(e) => {
                if self.verify == VerifyPolicy::Always {
                    return Err(RepoError::SignatureNotFound { url: sig_url });
                }
                tracing::debug!(url = %sig_url, error = %e, "no signature published");
                return Ok(None);
            }
        }

        if self.verify == VerifyPolicy::Later {
            return Ok(None);
        }
        let keyring = self.keyring.as_deref().ok_or(RepoError::NoKeyring)?;
        Ok(Some(verify_pack(archive, keyring)?))
    }
}

/// True iff the final path segment ends in the literal suffix `.tgz`.
///
/// Case-sensitive and suffix-only: `foo.tar.gz` and `foo.tgz.1` are
/// deliberately excluded. This governs which files a directory scan
/// considers to be fetchable archives.
pub fn is_tar(name: &str) -> bool {
    name.ends_with(".tgz")
}
