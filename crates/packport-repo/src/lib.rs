//! Packport repository engine
//!
//! This crate turns a human-given pack reference into a verified local
//! archive and maintains the metadata needed to do it repeatedly:
//!
//! - **Index**: a repository's catalog of published pack versions
//!   (parsing, constraint queries, merging, serialization)
//! - **Registry**: the durable repositories.yaml list of configured
//!   repositories, with atomic persistence and legacy-format recovery
//! - **Client**: per-repository index fetching and the parallel
//!   refresh-all operation
//! - **Downloader**: the resolver state machine, verification policy,
//!   and URL-to-repository reverse lookup
//!
//! All paths derive from an explicit [`Home`] value and all network
//! access goes through the [`Getter`] capability registry, so the whole
//! pipeline runs hermetically under a temporary root in tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use packport_repo::{Downloader, Home, Providers, VerifyPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut downloader = Downloader::new(Home::new("/opt/packport"), Providers::all());
//! downloader.verify = VerifyPolicy::IfPossible;
//! downloader.keyring = Some("/opt/packport/keyring.pub".into());
//!
//! let (path, verification) = downloader
//!     .download_to("testing/alpine", "^0.2", std::path::Path::new("/tmp"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod downloader;
pub mod error;
pub mod getter;
pub mod home;
pub mod index;
pub mod registry;
pub mod urlutil;

// Re-exports for convenience
pub use client::{find_pack_in_repo_url, refresh_all, PackRepository, RefreshOutcome};
pub use downloader::{is_tar, Downloader, ResolvedRef, VerifyPolicy};
pub use error::{RepoError, Result};
pub use getter::{Getter, GetterConstructor, GetterOptions, HttpGetter, Provider, Providers};
pub use home::Home;
pub use index::{index_directory, IndexFile, PackVersion, API_VERSION_V1};
pub use registry::{Entry, LoadedRepoFile, RepoFile};
