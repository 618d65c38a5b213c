//! Error types for tree construction, path edits, crypter dispatch, and decoding.

use crate::crypter::CryptoError;
use crate::path::PropertyPath;
use thiserror::Error;

/// Errors that can occur while building, editing, converting, or decoding a value tree.
#[derive(Error, Debug)]
pub enum SealError {
    /// The injected crypter failed during a batched pass. Batches span the
    /// whole forest, so no property path is attached.
    #[error("crypter error: {0}")]
    Crypto(#[from] CryptoError),

    /// The injected crypter failed while converting the leaf at `path`.
    #[error("{}: {source}", .path.label())]
    CryptoAt {
        path: PropertyPath,
        #[source]
        source: CryptoError,
    },

    /// The operation would produce an object of the exact shape
    /// `{"secure": <string>}`, which is reserved for encoding secure scalars.
    #[error("{}: maps with the single key \"secure\" are reserved", .path.label())]
    ReservedRepresentation { path: PropertyPath },

    /// A path segment addressed the wrong kind of container.
    #[error("{}: expected {expected}", .path.label())]
    TypeMismatch {
        path: PropertyPath,
        expected: &'static str,
    },

    /// An array index was negative or past the append position.
    #[error("{}: array index out of range", .path.label())]
    OutOfRange { path: PropertyPath },

    /// Property-path text could not be parsed.
    #[error("invalid property path {input:?}: {message}")]
    InvalidPath { input: String, message: String },

    /// A configuration key was not of the form `namespace:name`.
    #[error("invalid configuration key {input:?}: expected `namespace:name`")]
    InvalidKey { input: String },

    /// A batch crypter returned a different number of results than it was given.
    #[error("batch crypter returned {actual} values for {expected} inputs")]
    BatchLength { expected: usize, actual: usize },

    /// Malformed JSON input, or JSON output failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed YAML input, or YAML output failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias used throughout sealcfg-core.
pub type Result<T> = std::result::Result<T, SealError>;
