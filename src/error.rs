//! Error types for the Reelmatch library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`ReelmatchError`] enum. Build-time errors (`EmptyInput`, `InvalidInput`)
//! abort the whole build; serving-time errors (`UnknownTitle`,
//! `InvalidRequest`) are scoped to a single request; `IndexLoad` is fatal at
//! startup.
//!
//! # Examples
//!
//! ```
//! use reelmatch::error::{ReelmatchError, Result};
//!
//! fn lookup(title: &str) -> Result<usize> {
//!     Err(ReelmatchError::unknown_title(title))
//! }
//!
//! match lookup("Not A Movie") {
//!     Err(e) if e.is_recoverable() => eprintln!("{e}"),
//!     _ => unreachable!(),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Reelmatch operations.
#[derive(Error, Debug)]
pub enum ReelmatchError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A build was started without any ratings or features.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Build input that is present but malformed (duplicate titles, ragged rows, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The queried title is not part of the catalog.
    #[error("Unknown title: {0}")]
    UnknownTitle(String),

    /// A persisted artifact is missing or corrupt.
    #[error("Index load error: {0}")]
    IndexLoad(String),

    /// A serving request was rejected before any index was touched.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary serialization errors
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Result type alias for operations that may fail with ReelmatchError.
pub type Result<T> = std::result::Result<T, ReelmatchError>;

impl ReelmatchError {
    /// Create a new empty input error.
    pub fn empty_input<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::EmptyInput(msg.into())
    }

    /// Create a new invalid input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::InvalidInput(msg.into())
    }

    /// Create a new unknown title error.
    pub fn unknown_title<S: Into<String>>(title: S) -> Self {
        ReelmatchError::UnknownTitle(title.into())
    }

    /// Create a new index load error.
    pub fn index_load<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::IndexLoad(msg.into())
    }

    /// Create a new invalid request error.
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::InvalidRequest(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::Storage(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        ReelmatchError::InvalidConfig(msg.into())
    }

    /// Whether the error only affects the request that raised it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReelmatchError::UnknownTitle(_) | ReelmatchError::InvalidRequest(_)
        )
    }

    /// Re-tag any error raised while reading artifacts as a load failure.
    pub(crate) fn into_load_error(self, artifact: &str) -> Self {
        match self {
            ReelmatchError::IndexLoad(_) => self,
            other => ReelmatchError::IndexLoad(format!("{artifact}: {other}")),
        }
    }
}
