//! Configuration types for the provider index.
//!
//! The [`Config`] struct controls index behavior including:
//! - Text encoder (feature-hashing or builtin ONNX)
//! - Embedding dimension (384, 768, or custom)
//! - Artifact file names inside the data directory
//! - Durability of artifact writes
//!
//! # Example
//! ```rust
//! use provider_index::{Config, EmbeddingDimension, SyncMode};
//!
//! // Use defaults (hashing encoder, 384 dimensions)
//! let config = Config::default();
//!
//! // Customize for production
//! let config = Config {
//!     embedding_dimension: EmbeddingDimension::D768,
//!     sync_mode: SyncMode::Paranoid,
//!     ..Default::default()
//! };
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default file name of the record list artifact.
pub const DEFAULT_PROVIDERS_FILE: &str = "providers.json";

/// Default file name of the embedding matrix artifact.
pub const DEFAULT_EMBEDDINGS_FILE: &str = "embeddings.npy";

/// Default number of search results when a request leaves `top_n` out.
pub const DEFAULT_TOP_N: usize = 3;

/// Largest accepted custom embedding dimension.
const MAX_CUSTOM_DIMENSION: usize = 4096;

/// Index configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use provider_index::Config;
///
/// let config = Config {
///     default_top_n: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// How query and record text is turned into vectors.
    pub encoder: EncoderProvider,

    /// Embedding vector dimension (must match encoder output and stored matrix).
    pub embedding_dimension: EmbeddingDimension,

    /// File name of the record list inside the data directory.
    pub providers_file: String,

    /// File name of the embedding matrix inside the data directory.
    pub embeddings_file: String,

    /// Result count used when a search request omits `top_n`.
    pub default_top_n: usize,

    /// Durability mode for artifact writes.
    pub sync_mode: SyncMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Hashing needs no model files and is fully deterministic
            encoder: EncoderProvider::Hashing,
            // 384 matches all-MiniLM-L6-v2, the default builtin model
            embedding_dimension: EmbeddingDimension::D384,
            providers_file: DEFAULT_PROVIDERS_FILE.to_string(),
            embeddings_file: DEFAULT_EMBEDDINGS_FILE.to_string(),
            default_top_n: DEFAULT_TOP_N,
            sync_mode: SyncMode::Normal,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config for the builtin ONNX encoder.
    ///
    /// This requires the `builtin-embeddings` feature to be enabled.
    ///
    /// # Example
    /// ```rust
    /// use provider_index::Config;
    ///
    /// let config = Config::with_builtin_encoder();
    /// assert!(config.encoder.is_builtin());
    /// ```
    pub fn with_builtin_encoder() -> Self {
        Self {
            encoder: EncoderProvider::Builtin { model_path: None },
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `ProviderIndex::open()`.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - Custom dimension is 0 or > 4096
    /// - `default_top_n` is 0
    /// - An artifact file name is empty, contains a path separator,
    ///   or both artifacts share a name
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let EmbeddingDimension::Custom(dim) = self.embedding_dimension {
            if dim == 0 {
                return Err(ValidationError::invalid_field(
                    "embedding_dimension",
                    "custom dimension must be greater than 0",
                ));
            }
            if dim > MAX_CUSTOM_DIMENSION {
                return Err(ValidationError::invalid_field(
                    "embedding_dimension",
                    format!("custom dimension must not exceed {MAX_CUSTOM_DIMENSION}"),
                ));
            }
        }

        if self.default_top_n == 0 {
            return Err(ValidationError::invalid_field(
                "default_top_n",
                "must be greater than 0",
            ));
        }

        validate_file_name("providers_file", &self.providers_file)?;
        validate_file_name("embeddings_file", &self.embeddings_file)?;

        if self.providers_file == self.embeddings_file {
            return Err(ValidationError::invalid_field(
                "embeddings_file",
                "must differ from providers_file",
            ));
        }

        Ok(())
    }

    /// Returns the embedding dimension as a numeric value.
    pub fn dimension(&self) -> usize {
        self.embedding_dimension.size()
    }

    /// Path of the record list artifact under `data_dir`.
    pub fn providers_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.providers_file)
    }

    /// Path of the embedding matrix artifact under `data_dir`.
    pub fn embeddings_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.embeddings_file)
    }
}

fn validate_file_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::invalid_field(field, "must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ValidationError::invalid_field(
            field,
            format!("must be a plain file name, got '{name}'"),
        ));
    }
    Ok(())
}

/// Text encoder configuration.
///
/// Determines how vectors are produced for records and queries.
#[derive(Clone, Debug, Default)]
pub enum EncoderProvider {
    /// Signed feature hashing over lowercase word tokens.
    ///
    /// Deterministic, dependency-free, and fast. Similarity reflects word
    /// overlap rather than meaning.
    #[default]
    Hashing,

    /// Sentence-transformer model executed locally through ONNX Runtime.
    ///
    /// Requires the `builtin-embeddings` feature. The default model is
    /// all-MiniLM-L6-v2 (384 dimensions).
    Builtin {
        /// Custom model directory. If `None`, uses the cached default model.
        model_path: Option<PathBuf>,
    },
}

impl EncoderProvider {
    /// Returns true if this is the builtin provider.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }

    /// Returns true if this is the hashing provider.
    pub fn is_hashing(&self) -> bool {
        matches!(self, Self::Hashing)
    }
}

/// Embedding vector dimensions.
///
/// Standard dimensions are provided for common models. Use `Custom` for
/// other encoders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingDimension {
    /// 384 dimensions (all-MiniLM-L6-v2, default builtin model).
    #[default]
    D384,

    /// 768 dimensions (bge-base-en-v1.5, BERT-base).
    D768,

    /// Custom dimension for other encoders.
    ///
    /// Must be between 1 and 4096.
    Custom(usize),
}

impl EmbeddingDimension {
    /// Returns the numeric size of this dimension.
    ///
    /// # Example
    /// ```rust
    /// use provider_index::EmbeddingDimension;
    ///
    /// assert_eq!(EmbeddingDimension::D384.size(), 384);
    /// assert_eq!(EmbeddingDimension::D768.size(), 768);
    /// assert_eq!(EmbeddingDimension::Custom(64).size(), 64);
    /// ```
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::D384 => 384,
            Self::D768 => 768,
            Self::Custom(n) => *n,
        }
    }
}

/// Durability mode for artifact writes.
///
/// Controls the trade-off between insert latency and crash safety.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Fsync each staged artifact before it replaces the committed one.
    #[default]
    Normal,

    /// Skip fsync entirely (faster, may lose the latest insert on power loss).
    Fast,

    /// Fsync staged artifacts and the data directory after each replace.
    Paranoid,
}

impl SyncMode {
    /// Returns true if staged files are fsynced before replace.
    pub fn syncs_files(&self) -> bool {
        !matches!(self, Self::Fast)
    }

    /// Returns true if the directory entry is fsynced after replace.
    pub fn syncs_directory(&self) -> bool {
        matches!(self, Self::Paranoid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.encoder.is_hashing());
        assert_eq!(config.embedding_dimension, EmbeddingDimension::D384);
        assert_eq!(config.providers_file, "providers.json");
        assert_eq!(config.embeddings_file, "embeddings.npy");
        assert_eq!(config.default_top_n, 3);
        assert_eq!(config.sync_mode, SyncMode::Normal);
    }

    #[test]
    fn test_with_builtin_encoder() {
        let config = Config::with_builtin_encoder();
        assert!(config.encoder.is_builtin());
        assert_eq!(config.dimension(), 384);
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_default_top_n_zero() {
        let config = Config {
            default_top_n: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidField { field, .. } if field == "default_top_n")
        );
    }

    #[test]
    fn test_validate_custom_dimension_bounds() {
        for dim in [0, 5000] {
            let config = Config {
                embedding_dimension: EmbeddingDimension::Custom(dim),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "dimension {dim} accepted");
        }

        let config = Config {
            embedding_dimension: EmbeddingDimension::Custom(1536),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_file_names() {
        let nested = Config {
            providers_file: "sub/providers.json".to_string(),
            ..Default::default()
        };
        assert!(nested.validate().is_err());

        let empty = Config {
            embeddings_file: "  ".to_string(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let same = Config {
            embeddings_file: "providers.json".to_string(),
            ..Default::default()
        };
        assert!(same.validate().is_err());
    }

    #[test]
    fn test_artifact_paths() {
        let config = Config::default();
        let dir = Path::new("/srv/data");
        assert_eq!(
            config.providers_path(dir),
            PathBuf::from("/srv/data/providers.json")
        );
        assert_eq!(
            config.embeddings_path(dir),
            PathBuf::from("/srv/data/embeddings.npy")
        );
    }

    #[test]
    fn test_sync_mode_checks() {
        assert!(SyncMode::Normal.syncs_files());
        assert!(!SyncMode::Normal.syncs_directory());
        assert!(!SyncMode::Fast.syncs_files());
        assert!(SyncMode::Paranoid.syncs_files());
        assert!(SyncMode::Paranoid.syncs_directory());
    }

    #[test]
    fn test_embedding_dimension_serialization() {
        let dim = EmbeddingDimension::Custom(512);
        let json = serde_json::to_string(&dim).unwrap();
        let restored: EmbeddingDimension = serde_json::from_str(&json).unwrap();
        assert_eq!(dim, restored);
    }
}
