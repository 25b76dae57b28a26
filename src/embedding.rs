//! Embedding provider seam and the synchronous ONNX implementation.
//!
//! The engine depends only on [`EmbeddingProvider`]; the production
//! implementation runs bge-small-en-v1.5 (384 dimensions) with mean
//! pooling and L2 normalization.

use hf_hub::api::sync::Api;
use ort::inputs;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::TruncationParams;
use tracing::warn;

use crate::errors::Error;

/// Embedding dimensions for the default bge-small-en-v1.5 model.
pub const EMBEDDING_DIMS: usize = 384;

/// Turns text into a fixed-dimension dense vector.
///
/// `generate_embedding` returns None on failure (empty input or a model
/// error) rather than an error: retrieval degrades to lexical-only when
/// the provider is unavailable, and mutation operations translate None
/// into their own failure.
///
/// Implementations take `&mut self` because inference engines typically
/// mutate internal state (tensor allocations) per call.
pub trait EmbeddingProvider {
    fn generate_embedding(&mut self, text: &str) -> Option<Vec<f32>>;

    /// Fixed dimensionality of produced vectors for this deployment.
    fn dimensions(&self) -> usize;
}

/// ONNX embedding engine for synchronous text-to-vector conversion.
pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    requires_token_type_ids: bool,
}

impl OnnxEmbedder {
    /// Load model from cache or download on first use.
    ///
    /// Uses `hf_hub::api::sync::Api` with the ureq feature for blocking
    /// I/O; files are cached locally and only downloaded once.
    pub fn new(model_id: &str) -> Result<Self, Error> {
        let api = Api::new()?;
        let repo = api.model(model_id.to_string());

        let model_path = repo
            .get("onnx/model.onnx")
            .or_else(|_| repo.get("model.onnx"))?;
        let tokenizer_path = repo.get("tokenizer.json")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: 512,
                ..Default::default()
            }))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(ort::Error::from)?
            .commit_from_file(&model_path)?;

        let requires_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        Ok(OnnxEmbedder {
            session,
            tokenizer,
            requires_token_type_ids,
        })
    }

    /// Run one inference pass. Texts beyond 512 tokens are truncated by
    /// the tokenizer.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, Error> {
        let encoding = self.tokenizer.encode(text, true)?;
        let input_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        if input_ids.is_empty() {
            return Err(Error::Embedding("input produced no tokens".to_string()));
        }

        let seq_len = input_ids.len();

        let input_ids_vec: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

        let input_ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids_vec))?;
        let attention_mask_tensor = Tensor::from_array(([1usize, seq_len], attention_mask_vec))?;

        // Only include token_type_ids if the model requires it
        let outputs = if self.requires_token_type_ids {
            let token_type_ids_vec: Vec<i64> = vec![0i64; seq_len];
            let token_type_ids_tensor =
                Tensor::from_array(([1usize, seq_len], token_type_ids_vec))?;
            self.session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])?
        } else {
            self.session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])?
        };

        let last_hidden_state = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .ok_or_else(|| {
                Error::Embedding(
                    "output tensor 'last_hidden_state' or 'token_embeddings' not found".to_string(),
                )
            })?
            .try_extract_tensor::<f32>()?;

        let (shape, data) = last_hidden_state;
        if shape.len() != 3 {
            return Err(Error::Embedding(format!(
                "expected 3D output (batch, seq_len, hidden), got {:?}",
                shape
            )));
        }

        let batch_size = shape[0] as usize;
        let hidden_dim = shape[2] as usize;

        if batch_size != 1 || hidden_dim != EMBEDDING_DIMS {
            return Err(Error::Embedding(format!(
                "unexpected output shape {:?}, wanted batch=1, hidden={}",
                shape, EMBEDDING_DIMS
            )));
        }

        // Mean pooling weighted by the attention mask
        let mut pooled = vec![0.0f32; EMBEDDING_DIMS];
        for (token_idx, chunk) in data.chunks(hidden_dim).take(seq_len).enumerate() {
            let mask_value = attention_mask.get(token_idx).copied().unwrap_or(0) as f32;
            for (dim, pooled_value) in pooled.iter_mut().enumerate() {
                *pooled_value += chunk[dim] * mask_value;
            }
        }

        let mask_sum: f32 = attention_mask
            .iter()
            .take(seq_len)
            .map(|&m| m as f32)
            .sum::<f32>()
            .max(1e-9);
        for value in pooled.iter_mut() {
            *value /= mask_sum;
        }

        Ok(l2_normalize(&pooled))
    }
}

impl EmbeddingProvider for OnnxEmbedder {
    fn generate_embedding(&mut self, text: &str) -> Option<Vec<f32>> {
        if text.trim().is_empty() {
            return None;
        }
        match self.embed(text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "embedding generation failed");
                None
            }
        }
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMS
    }
}

fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    let norm = norm.max(1e-9);

    vec.iter().map(|&x| x / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let vec = vec![1.0, 0.0, 0.0];
        let normalized = l2_normalize(&vec);

        let norm: f32 = normalized.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let vec = vec![0.0, 0.0, 0.0];
        let normalized = l2_normalize(&vec);

        assert_eq!(normalized, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_l2_normalize_magnitude() {
        let vec = vec![3.0, 4.0];
        let normalized = l2_normalize(&vec);

        let norm: f32 = normalized.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[ignore]
    #[test]
    fn test_integration_simple_text() {
        let mut embedder = OnnxEmbedder::new("BAAI/bge-small-en-v1.5").expect("load model");
        let embedding = embedder.generate_embedding("hello world").expect("embed text");

        assert_eq!(embedding.len(), EMBEDDING_DIMS);
        let norm: f32 = embedding.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "embedding should be L2-normalized");
        assert!(embedding.iter().all(|&x| x.is_finite()));
    }

    #[ignore]
    #[test]
    fn test_integration_empty_text_is_none() {
        let mut embedder = OnnxEmbedder::new("BAAI/bge-small-en-v1.5").expect("load model");
        assert!(embedder.generate_embedding("").is_none());
        assert!(embedder.generate_embedding("   \t\n  ").is_none());
    }
}
