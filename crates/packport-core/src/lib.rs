//! Packport Core - pack metadata, archives, digests, and signatures
//!
//! This crate provides the collaborators the repository engine consumes:
//! - `Pack`: a template package, loadable from a directory or `.tgz` archive
//! - `archive`: tarball creation and inspection
//! - `digest`: SHA256 content hashes for integrity comparison
//! - `verify`: detached minisign signature verification

pub mod archive;
pub mod digest;
pub mod error;
pub mod pack;
pub mod verify;

pub use archive::{create_archive, default_archive_name, load_archive, load_metadata};
pub use digest::{digest_bytes, digest_file, digest_matches};
pub use error::{CoreError, Result};
pub use pack::{Pack, PackMetadata, PACK_YAML};
pub use verify::{signature_path, verify_pack, Verification};
