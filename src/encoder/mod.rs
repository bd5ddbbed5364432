//! Text encoder abstractions.
//!
//! A text encoder turns a string into a fixed-dimension vector such that
//! semantically similar texts score a higher cosine similarity. For a given
//! model version the output must be deterministic.
//!
//! # Providers
//!
//! - [`HashingEncoder`] - Signed feature hashing over word tokens (default)
//! - `OnnxEncoder` - Built-in ONNX sentence transformer (requires `builtin-embeddings` feature)
//!
//! # Example
//!
//! ```rust
//! use provider_index::encoder::{HashingEncoder, TextEncoder};
//!
//! let encoder = HashingEncoder::new(384);
//! let vector = encoder.encode("Utility assistance").unwrap();
//! assert_eq!(vector.len(), 384);
//! ```

mod hashing;
#[cfg(feature = "builtin-embeddings")]
pub mod onnx;

pub use hashing::HashingEncoder;

use crate::config::{Config, EncoderProvider};
use crate::error::{ProviderIndexError, Result};
use crate::types::Embedding;

/// Text encoder trait for generating vector representations of text.
///
/// Implementations must be thread-safe (`Send + Sync`): searches and inserts
/// encode concurrently from many threads.
///
/// # Implementing a Custom Encoder
///
/// ```rust,ignore
/// use provider_index::encoder::TextEncoder;
/// use provider_index::{Embedding, ProviderIndexError, Result};
///
/// struct RemoteEncoder {
///     client: MyApiClient,
///     dimension: usize,
/// }
///
/// impl TextEncoder for RemoteEncoder {
///     fn encode(&self, text: &str) -> Result<Embedding> {
///         self.client
///             .embed(text)
///             .map_err(|e| ProviderIndexError::encoding(e.to_string()))
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
/// }
/// ```
pub trait TextEncoder: Send + Sync {
    /// Generates an embedding for a single text.
    ///
    /// # Errors
    ///
    /// Returns `ProviderIndexError::Encoding` if the vector cannot be produced.
    fn encode(&self, text: &str) -> Result<Embedding>;

    /// Generates embeddings for multiple texts, in input order.
    ///
    /// The default implementation encodes one text at a time; encoders
    /// with real batching (e.g. ONNX) override it.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }

    /// Returns the dimension of vectors produced by this encoder.
    fn dimension(&self) -> usize;

    /// Checks that a vector produced by this encoder is usable for ranking.
    ///
    /// The index calls this on every encoder output.
    ///
    /// # Errors
    ///
    /// Returns `ProviderIndexError::Encoding` if the length differs from
    /// [`dimension`](Self::dimension) or any component is not finite.
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        let expected = self.dimension();
        if embedding.len() != expected {
            return Err(ProviderIndexError::encoding(format!(
                "encoder produced {} components, expected {expected}",
                embedding.len()
            )));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(ProviderIndexError::encoding(
                "encoder produced a non-finite component",
            ));
        }
        Ok(())
    }
}

/// Encodes `text` and checks the output is usable for ranking.
///
/// Any shape or value problem in the encoder's output is an encoding
/// failure, not a caller error.
pub(crate) fn encode_checked(encoder: &dyn TextEncoder, text: &str) -> Result<Embedding> {
    let vector = encoder.encode(text)?;
    encoder.validate_embedding(&vector)?;
    Ok(vector)
}

/// Batch form of [`encode_checked`].
pub(crate) fn encode_batch_checked(
    encoder: &dyn TextEncoder,
    texts: &[&str],
) -> Result<Vec<Embedding>> {
    let vectors = encoder.encode_batch(texts)?;
    if vectors.len() != texts.len() {
        return Err(ProviderIndexError::encoding(format!(
            "encoder returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    for vector in &vectors {
        encoder.validate_embedding(vector)?;
    }
    Ok(vectors)
}

/// Creates a text encoder based on the configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Builtin encoder requested but feature not enabled
/// - ONNX model loading fails (for builtin provider)
pub fn create_encoder(config: &Config) -> Result<Box<dyn TextEncoder>> {
    match &config.encoder {
        EncoderProvider::Hashing => Ok(Box::new(HashingEncoder::new(config.dimension()))),

        #[cfg(feature = "builtin-embeddings")]
        EncoderProvider::Builtin { model_path } => {
            let encoder = onnx::OnnxEncoder::with_dimension(model_path.clone(), config.dimension())?;
            Ok(Box::new(encoder))
        }

        #[cfg(not(feature = "builtin-embeddings"))]
        EncoderProvider::Builtin { .. } => Err(ProviderIndexError::encoding(
            "Builtin encoder requires the 'builtin-embeddings' feature",
        )),
    }
}
