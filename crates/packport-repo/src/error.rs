//! Error types for repository operations

use thiserror::Error;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Index Errors ============
    #[error("no API version specified")]
    NoApiVersion,

    #[error("no pack named {name} found")]
    NoPackName { name: String },

    #[error("no versions recorded for pack {name}")]
    NoPackVersion { name: String },

    #[error("no pack version found for {name}-{constraint}")]
    NoMatchingVersion { name: String, constraint: String },

    #[error("invalid version constraint {constraint}: {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("invalid index data: {message}")]
    InvalidIndex { message: String },

    #[error("no usable cached index for repository {name}: {message}")]
    NoCachedIndex { name: String, message: String },

    #[error("pack {name} has no downloadable URLs")]
    NoDownloadUrls { name: String },

    // ============ Registry Errors ============
    #[error("repository {name} not found")]
    RepoNotFound { name: String },

    #[error("no configured repository owns {url}")]
    NoOwnerRepo { url: String },

    // ============ Transport Errors ============
    #[error("no protocol handler registered for scheme {scheme:?}")]
    UnknownScheme { scheme: String },

    #[error("invalid repository URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("HTTP error {status} fetching {url}")]
    Http { status: u16, url: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out fetching {url}")]
    Timeout { url: String },

    // ============ Resolution Errors ============
    #[error("pack reference {reference} not found")]
    RefNotFound { reference: String },

    #[error("{name} not found in {repo_url} repository")]
    NotFoundInRepo { name: String, repo_url: String },

    #[error("{repo_url} is not a valid pack repository or cannot be reached: {message}")]
    InvalidRepo { repo_url: String, message: String },

    // ============ Verification Errors ============
    #[error("cannot verify a directory: {path}")]
    CannotVerifyDirectory { path: String },

    #[error("verification requested but no keyring configured")]
    NoKeyring,

    #[error("signature required but not found at {url}")]
    SignatureNotFound { url: String },

    #[error("digest mismatch for {url}: expected {expected}, got {actual}")]
    DigestMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    // ============ Filesystem ============
    #[error("could not read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ Passthrough ============
    #[error("pack error: {0}")]
    Core(#[from] packport_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        let url = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if e.is_timeout() {
            RepoError::Timeout { url }
        } else if let Some(status) = e.status() {
            RepoError::Http {
                status: status.as_u16(),
                url,
            }
        } else {
            RepoError::Network {
                message: e.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidUrl {
            url: String::new(),
            message: e.to_string(),
        }
    }
}
