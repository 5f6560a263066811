//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("pack not found: {path}")]
    PackNotFound { path: String },

    #[error("invalid Pack.yaml: {message}")]
    InvalidPack { message: String },

    #[error("failed to parse Pack.yaml: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {message}")]
    Archive { message: String },

    #[error("pack already exists at {path}")]
    AlreadyExists { path: String },

    #[error("no signature found for {path}")]
    MissingSignature { path: String },

    #[error("invalid public key in {path}: {message}")]
    InvalidKeyring { path: String, message: String },

    #[error("signature verification failed for {path}: {message}")]
    SignatureInvalid { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
