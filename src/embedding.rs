//! Text embedding backends.
//!
//! The search core consumes embeddings through the [`TextEmbedder`] trait:
//! - [`FastembedEmbedder`] wraps fastembed's ONNX models (the default is a
//!   multilingual paraphrase model, so Greek and English queries both work)
//! - [`HashEmbedder`] is a deterministic FNV-1a feature-hashing embedder
//!   with no model download, used for tests and offline deployments

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{InitOptions, TextEmbedding};

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("model initialization failed: {0}")]
    InitFailed(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("invalid model name: {0}")]
    InvalidModel(String),
}

/// Opaque text-to-vector capability.
///
/// Implementations must be deterministic for a fixed model, return one
/// equal-length vector per input string, and fail loudly rather than
/// degrade silently.
pub trait TextEmbedder: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn model_name(&self) -> &str;
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct FastembedEmbedder {
    model: Mutex<TextEmbedding>,
    model_name: String,
}

impl FastembedEmbedder {
    /// Create a new fastembed-backed embedder.
    ///
    /// The model is downloaded on first use if not cached. Models are cached
    /// in the `models/` subdirectory of `cache_dir`. Output vectors are
    /// L2-normalized by the model, so inner product equals cosine similarity.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_enum = parse_model_name(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
        })
    }
}

impl TextEmbedder for FastembedEmbedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("failed to acquire model lock: {}", e))
        })?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Parse a model name string to the fastembed enum.
fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name.to_lowercase().as_str() {
        "paraphrase-multilingual-minilm-l12-v2" | "paraphrasemlminilml12v2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
        }
        "paraphrase-multilingual-mpnet-base-v2" | "paraphrasemlmpnetbasev2" => {
            Ok(fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2)
        }
        "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        _ => Err(EmbeddingError::InvalidModel(format!(
            "unknown model: {}. Supported models: paraphrase-multilingual-MiniLM-L12-v2, paraphrase-multilingual-mpnet-base-v2, all-MiniLM-L6-v2, bge-small-en-v1.5, hash",
            name
        ))),
    }
}

/// Dimensions of the hash embedder's output vectors.
const HASH_EMBEDDER_DIMENSIONS: usize = 256;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Deterministic feature-hashing embedder.
///
/// Hashes whitespace tokens of the lowercased input into a fixed number of
/// buckets with FNV-1a and L2-normalizes the result. Texts sharing tokens
/// get a positive inner product, which is enough signal for ranking tests
/// and for deployments that cannot download a model.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: HASH_EMBEDDER_DIMENSIONS,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text.to_lowercase().split_whitespace() {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEmbedder for HashEmbedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn model_name(&self) -> &str {
        "hash"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_name() {
        let temp_dir = std::env::temp_dir().join("shop-search-embed-invalid");
        let result = FastembedEmbedder::new("nonexistent-model", temp_dir);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[test]
    fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::new();
        let texts = vec!["black jeans".to_string(), "μαύρο τζιν".to_string()];

        let first = embedder.encode(&texts).unwrap();
        let second = embedder.encode(&texts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hash_embedder_normalized() {
        let embedder = HashEmbedder::new();
        let vectors = embedder.encode(&["slim fit jeans".to_string()]).unwrap();

        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedder_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new();
        let vectors = embedder.encode(&["".to_string()]).unwrap();
        assert!(vectors[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_hash_embedder_token_overlap_scores_higher() {
        let embedder = HashEmbedder::new();
        let vectors = embedder
            .encode(&[
                "black jeans".to_string(),
                "black slim jeans".to_string(),
                "leather sandals".to_string(),
            ])
            .unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };

        let related = dot(&vectors[0], &vectors[1]);
        let unrelated = dot(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
        assert!(related > 0.5);
    }

    #[test]
    #[ignore = "requires model download (~120MB)"]
    fn test_fastembed_encode() {
        let temp_dir = std::env::temp_dir().join("shop-search-embed-real");
        let embedder =
            FastembedEmbedder::new("paraphrase-multilingual-minilm-l12-v2", temp_dir.clone())
                .unwrap();

        let vectors = embedder
            .encode(&["black jeans".to_string(), "μαύρο τζιν".to_string()])
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), vectors[1].len());

        // multilingual model should place translations close together
        let dot: f32 = vectors[0].iter().zip(&vectors[1]).map(|(a, b)| a * b).sum();
        assert!(dot > 0.5, "cross-language similarity too low: {dot}");

        let _ = std::fs::remove_dir_all(&temp_dir);
    }
}
