//! ONNX-based sentence encoder.
//!
//! Requires the `builtin-embeddings` feature.
//!
//! # Supported Models
//!
//! - **all-MiniLM-L6-v2** (384 dimensions) - Default, the model the stored
//!   provider matrices are normally built with
//! - **bge-base-en-v1.5** (768 dimensions)
//!
//! # Pipeline
//!
//! ```text
//! Text → Tokenize → ONNX Inference → Mean Pool → L2 Normalize → Embedding
//! ```
//!
//! Single texts and batches share one code path: a batch is padded to its
//! longest member and pooled per row using the attention mask.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::encoder::TextEncoder;
use crate::error::{ProviderIndexError, Result};
use crate::types::Embedding;

const MINILM_MODEL_NAME: &str = "all-MiniLM-L6-v2";
const MINILM_DIMENSION: usize = 384;
const MINILM_MAX_LENGTH: usize = 256;

const BGE_MODEL_NAME: &str = "bge-base-en-v1.5";
const BGE_DIMENSION: usize = 768;
const BGE_MAX_LENGTH: usize = 512;

const MODEL_FILENAME: &str = "model.onnx";
const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Sentence encoder running a transformer model through ONNX Runtime.
///
/// Model and tokenizer are loaded at construction, so a missing model is a
/// startup problem rather than a failure on the first request.
pub struct OnnxEncoder {
    /// `Session::run()` takes `&mut self`; the encoder is shared by `&self`.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    max_length: usize,
}

impl std::fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl OnnxEncoder {
    /// Loads all-MiniLM-L6-v2 from `model_path` or the cache directory.
    pub fn new(model_path: Option<PathBuf>) -> Result<Self> {
        Self::with_dimension(model_path, MINILM_DIMENSION)
    }

    /// Loads a model producing `dimension` components.
    ///
    /// Without `model_path`, only 384 (all-MiniLM-L6-v2) and 768
    /// (bge-base-en-v1.5) have a default cached model.
    pub fn with_dimension(model_path: Option<PathBuf>, dimension: usize) -> Result<Self> {
        let max_length = if dimension == BGE_DIMENSION {
            BGE_MAX_LENGTH
        } else {
            MINILM_MAX_LENGTH
        };

        let model_dir = resolve_model_dir(model_path.as_deref(), dimension)?;

        info!(
            model_dir = %model_dir.display(),
            dimension,
            max_length,
            "Loading ONNX encoder"
        );

        let model_file = model_dir.join(MODEL_FILENAME);
        let tokenizer_file = model_dir.join(TOKENIZER_FILENAME);
        for required in [&model_file, &tokenizer_file] {
            if !required.exists() {
                return Err(ProviderIndexError::encoding(format!(
                    "model file not found: {}",
                    required.display()
                )));
            }
        }

        let session = create_session(&model_file)?;
        let tokenizer = load_tokenizer(&tokenizer_file, max_length)?;

        debug!(dimension, "ONNX encoder ready");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension,
            max_length,
        })
    }

    /// Downloads the default model for `dimension` into the cache directory.
    ///
    /// Files already present are kept. Returns the model directory.
    pub fn download_default_model(dimension: usize) -> Result<PathBuf> {
        let (model_name, repo) = match dimension {
            MINILM_DIMENSION => (MINILM_MODEL_NAME, "sentence-transformers/all-MiniLM-L6-v2"),
            BGE_DIMENSION => (BGE_MODEL_NAME, "BAAI/bge-base-en-v1.5"),
            _ => {
                return Err(ProviderIndexError::encoding(format!(
                    "no default model for dimension {dimension}"
                )))
            }
        };

        let dir = default_cache_dir(model_name);
        std::fs::create_dir_all(&dir).map_err(|e| {
            ProviderIndexError::encoding(format!("cannot create {}: {e}", dir.display()))
        })?;

        for (remote, local) in [
            (format!("onnx/{MODEL_FILENAME}"), MODEL_FILENAME),
            (TOKENIZER_FILENAME.to_string(), TOKENIZER_FILENAME),
        ] {
            let dest = dir.join(local);
            if dest.exists() {
                continue;
            }
            let url = format!("https://huggingface.co/{repo}/resolve/main/{remote}");
            info!(%url, dest = %dest.display(), "Downloading model file");
            download_file(&url, &dest)?;
        }

        Ok(dir)
    }

    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let encodings = texts
            .iter()
            .map(|t| self.tokenizer.encode(*t, true))
            .collect::<std::result::Result<Vec<Encoding>, _>>()
            .map_err(|e| ProviderIndexError::encoding(format!("tokenization failed: {e}")))?;

        let batch = encodings.len();
        let width = encodings
            .iter()
            .map(|enc| enc.get_ids().len().min(self.max_length))
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Ok(vec![vec![0.0; self.dimension]; batch]);
        }

        let mut input_ids = vec![0i64; batch * width];
        let mut attention = vec![0i64; batch * width];
        for (row, enc) in encodings.iter().enumerate() {
            let len = enc.get_ids().len().min(self.max_length);
            for col in 0..len {
                input_ids[row * width + col] = i64::from(enc.get_ids()[col]);
                attention[row * width + col] = i64::from(enc.get_attention_mask()[col]);
            }
        }

        let ids_tensor = tensor(batch, width, input_ids)?;
        let mask_tensor = tensor(batch, width, attention.clone())?;
        let type_tensor = tensor(batch, width, vec![0i64; batch * width])?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ProviderIndexError::encoding("ONNX session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
            .map_err(|e| ProviderIndexError::encoding(format!("inference failed: {e}")))?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ProviderIndexError::encoding(format!("output extraction failed: {e}")))?;

        let stride = width * self.dimension;
        if data.len() < batch * stride {
            return Err(ProviderIndexError::encoding(format!(
                "model output has {} values, expected {}",
                data.len(),
                batch * stride
            )));
        }

        Ok((0..batch)
            .map(|row| {
                let mask = &attention[row * width..(row + 1) * width];
                let tokens = &data[row * stride..(row + 1) * stride];
                let mut pooled = mean_pool(tokens, mask, self.dimension);
                l2_normalize(&mut pooled);
                pooled
            })
            .collect())
    }
}

impl TextEncoder for OnnxEncoder {
    fn encode(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.run_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| ProviderIndexError::encoding("model returned no output"))
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn tensor(rows: usize, cols: usize, values: Vec<i64>) -> Result<ort::value::Tensor<i64>> {
    let array = Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| ProviderIndexError::encoding(format!("tensor shape error: {e}")))?;
    ort::value::Tensor::from_array(array)
        .map_err(|e| ProviderIndexError::encoding(format!("tensor creation failed: {e}")))
}

fn create_session(model_file: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| ProviderIndexError::encoding(format!("session builder failed: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| ProviderIndexError::encoding(format!("optimization level rejected: {e}")))?
        .commit_from_file(model_file)
        .map_err(|e| {
            ProviderIndexError::encoding(format!(
                "cannot load ONNX model {}: {e}",
                model_file.display()
            ))
        })
}

fn load_tokenizer(tokenizer_file: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(tokenizer_file).map_err(|e| {
        ProviderIndexError::encoding(format!(
            "cannot load tokenizer {}: {e}",
            tokenizer_file.display()
        ))
    })?;

    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length,
            strategy: tokenizers::TruncationStrategy::LongestFirst,
            ..Default::default()
        }))
        .map_err(|e| ProviderIndexError::encoding(format!("truncation rejected: {e}")))?;

    // Padding is done per batch in run_batch.
    tokenizer.with_padding(None);

    Ok(tokenizer)
}

fn resolve_model_dir(model_path: Option<&Path>, dimension: usize) -> Result<PathBuf> {
    if let Some(path) = model_path {
        if !path.exists() {
            return Err(ProviderIndexError::encoding(format!(
                "model directory not found: {}",
                path.display()
            )));
        }
        return Ok(path.to_path_buf());
    }

    let model_name = match dimension {
        MINILM_DIMENSION => MINILM_MODEL_NAME,
        BGE_DIMENSION => BGE_MODEL_NAME,
        _ => {
            return Err(ProviderIndexError::encoding(format!(
                "no default model for dimension {dimension}; provide a model_path"
            )))
        }
    };

    let dir = default_cache_dir(model_name);
    if !dir.join(MODEL_FILENAME).exists() {
        return Err(ProviderIndexError::encoding(format!(
            "model not found at {}; run OnnxEncoder::download_default_model({dimension})",
            dir.display()
        )));
    }
    Ok(dir)
}

/// `<cache>/provider-index/models/<name>`.
fn default_cache_dir(model_name: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("provider-index")
        .join("models")
        .join(model_name)
}

/// Attention-weighted mean over `[seq_len, dim]` token vectors.
fn mean_pool(tokens: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut weight_sum = 0.0f32;

    for (t, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        weight_sum += 1.0;
        let token = &tokens[t * dim..(t + 1) * dim];
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }

    if weight_sum > 0.0 {
        for value in &mut pooled {
            *value /= weight_sum;
        }
    }
    pooled
}

fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn download_file(url: &str, dest: &Path) -> Result<()> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| ProviderIndexError::encoding(format!("download failed for {url}: {e}")))?;

    let mut reader = response.into_body().into_reader();
    let mut file = std::fs::File::create(dest).map_err(|e| {
        ProviderIndexError::encoding(format!("cannot create {}: {e}", dest.display()))
    })?;
    std::io::copy(&mut reader, &mut file).map_err(|e| {
        ProviderIndexError::encoding(format!("cannot write {}: {e}", dest.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0; 3];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        let tokens = vec![
            1.0, 2.0, 3.0, // real
            99.0, 99.0, 99.0, // padding
        ];
        let pooled = mean_pool(&tokens, &[1, 0], 3);
        assert_eq!(pooled, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_averages() {
        let tokens = vec![1.0, 2.0, 5.0, 6.0];
        let pooled = mean_pool(&tokens, &[1, 1], 2);
        assert_eq!(pooled, vec![3.0, 4.0]);
    }

    #[test]
    fn test_resolve_model_dir_missing_path() {
        let err = resolve_model_dir(Some(Path::new("/nonexistent/model")), 384).unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn test_resolve_model_dir_unsupported_dimension() {
        let err = resolve_model_dir(None, 999).unwrap_err();
        assert!(err.to_string().contains("no default model"), "{err}");
    }

    #[test]
    fn test_default_cache_dir_format() {
        let dir = default_cache_dir("some-model");
        let s = dir.to_string_lossy();
        assert!(s.contains("provider-index") && s.ends_with("some-model"), "{s}");
    }

    #[test]
    fn test_onnx_encoder_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OnnxEncoder>();
    }
}
