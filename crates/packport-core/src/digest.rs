//! Content digests for downloaded archives
//!
//! Digests are integrity hashes, not signatures; signature checking lives
//! in [`crate::verify`].

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;

/// Compute the SHA256 digest of a byte slice, `sha256:<hex>` form.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Compute the SHA256 digest of a file on disk.
pub fn digest_file(path: &Path) -> Result<String> {
    Ok(digest_bytes(&std::fs::read(path)?))
}

/// Compare two digests, tolerating `sha256:`/`sha256-` prefixes and case.
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    fn normalize(d: &str) -> String {
        d.trim()
            .to_lowercase()
            .replace("sha256:", "")
            .replace("sha256-", "")
    }
    normalize(expected) == normalize(actual)
}
