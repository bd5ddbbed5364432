//! Error types for the provider index.
//!
//! The index uses a hierarchical error system:
//! - [`ProviderIndexError`] is the top-level error returned by all public APIs
//! - Specific error types ([`ValidationError`], [`StartupError`],
//!   [`StorageError`]) provide detail
//!
//! The four failure kinds a caller has to tell apart map onto the top-level
//! variants one-to-one:
//!
//! | Kind | Variant | State change |
//! |------|---------|--------------|
//! | invalid argument | [`ProviderIndexError::InvalidArgument`] | none |
//! | startup failure | [`ProviderIndexError::Startup`] | never reaches ready |
//! | storage failure | [`ProviderIndexError::Storage`] | published snapshot unchanged |
//! | encoding failure | [`ProviderIndexError::Encoding`] | none |
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use provider_index::{Config, ProviderIndex, Result};
//!
//! fn example() -> Result<()> {
//!     let index = ProviderIndex::open("./data", Config::default())?;
//!     let hits = index.search("food pantry", 3)?;
//!     index.close()?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for provider index operations.
pub type Result<T> = std::result::Result<T, ProviderIndexError>;

/// Top-level error enum for all provider index operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching or the `is_*` predicates to handle specific cases.
#[derive(Debug, Error)]
pub enum ProviderIndexError {
    /// Malformed request. Nothing was touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// Persisted artifacts missing, corrupt, or mutually inconsistent.
    #[error("Startup failure: {0}")]
    Startup(#[from] StartupError),

    /// Writing the artifacts failed during an insert.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The text encoder could not produce a usable vector.
    #[error("Encoding failure: {0}")]
    Encoding(String),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },
}

impl ProviderIndexError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an encoding error with the given message.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Returns true if this is an invalid-argument error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns true if this is a startup failure.
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Startup(_))
    }

    /// Returns true if this is a storage failure.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is an encoding failure.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the caller sent a bad request.
    ///
    /// Everything else is a service-side failure.
    pub fn is_client_error(&self) -> bool {
        self.is_invalid_argument()
    }
}

/// Validation errors for caller-supplied input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },

    /// A request parameter was not supplied at all.
    #[error("Missing {name} parameter")]
    MissingParameter {
        /// Wire name of the parameter.
        name: String,
    },

    /// `top_n` outside `1..=N`.
    #[error("top_n must be between 1 and {max}, got {top_n}")]
    TopNOutOfRange {
        /// Requested result count.
        top_n: i64,
        /// Number of records in the snapshot.
        max: usize,
    },

    /// The snapshot holds no records, so nothing can be ranked.
    #[error("index contains no records")]
    EmptyIndex,

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A vector's length doesn't match the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        got: usize,
    },
}

impl ValidationError {
    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }

    /// Creates a missing request parameter error.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Creates a `top_n` range error.
    pub fn top_n_out_of_range(top_n: i64, max: usize) -> Self {
        Self::TopNOutOfRange { top_n, max }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }
}

/// Errors that keep the index from ever reaching a serving state.
#[derive(Debug, Error)]
pub enum StartupError {
    /// One of the paired artifacts does not exist.
    #[error("artifact not found: {0}")]
    MissingArtifact(PathBuf),

    /// The artifact exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact was read but its content is invalid.
    #[error("malformed artifact {path}: {reason}")]
    Malformed {
        /// Artifact path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Record list and matrix disagree on the number of entries.
    #[error("record count {records} does not match embedding rows {rows}")]
    RowCountMismatch {
        /// Entries in the record list.
        records: usize,
        /// Rows in the embedding matrix.
        rows: usize,
    },

    /// Stored vectors were produced for a different dimension than the encoder's.
    #[error("embedding dimension mismatch: encoder produces {expected}, stored matrix has {found}")]
    DimensionMismatch {
        /// Encoder dimension.
        expected: usize,
        /// Stored matrix dimension.
        found: usize,
    },
}

impl StartupError {
    /// Creates a malformed-artifact error.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while persisting a new snapshot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O failure on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being written or replaced.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding an artifact failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The cross-process writer lock could not be taken.
    #[error("Writer lock failed: {0}")]
    Lock(String),
}

impl StorageError {
    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
