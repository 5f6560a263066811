//! Signature verification for pack archives
//!
//! An archive `foo.tgz` is signed by a detached minisign signature in
//! `foo.tgz.minisig`; the keyring is a minisign public key file.

use minisign::{PublicKeyBox, SignatureBox};
use std::io::Cursor;
use std::path::Path;

use crate::digest::digest_bytes;
use crate::error::{CoreError, Result};

/// Result of a successful verification
#[derive(Debug, Clone)]
pub struct Verification {
    /// SHA256 digest of the verified archive, `sha256:<hex>` form
    pub file_hash: String,

    /// Trusted comment embedded in the signature, if any
    pub signed_by: Option<String>,
}

/// Path of the detached signature for an archive.
pub fn signature_path(archive: &Path) -> std::path::PathBuf {
    let mut s = archive.as_os_str().to_os_string();
    s.push(".minisig");
    std::path::PathBuf::from(s)
}

/// Verify an archive against its detached signature and the given keyring.
///
/// Both the signature file and the keyring must exist; a missing signature
/// is an error here, policy decisions belong to the caller.
pub fn verify_pack(archive: &Path, keyring: &Path) -> Result<Verification> {
    let data = std::fs::read(archive)?;

    let sig_path = signature_path(archive);
    if !sig_path.exists() {
        return Err(CoreError::MissingSignature {
            path: sig_path.display().to_string(),
        });
    }

    let pk_content = std::fs::read_to_string(keyring)?;
    let pk = PublicKeyBox::from_string(&pk_content)
        .and_then(|b| b.into_public_key())
        .map_err(|e| CoreError::InvalidKeyring {
            path: keyring.display().to_string(),
            message: e.to_string(),
        })?;

    let sig_content = std::fs::read_to_string(&sig_path)?;
    let sig_box =
        SignatureBox::from_string(&sig_content).map_err(|e| CoreError::SignatureInvalid {
            path: archive.display().to_string(),
            message: e.to_string(),
        })?;

    let mut cursor = Cursor::new(&data);
    minisign::verify(&pk, &sig_box, &mut cursor, true, false, false).map_err(|e| {
        CoreError::SignatureInvalid {
            path: archive.display().to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(Verification {
        file_hash: digest_bytes(&data),
        signed_by: sig_box.trusted_comment().ok(),
    })
}
