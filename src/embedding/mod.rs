pub mod hash;
pub mod http;
pub mod precomputed;

use log::{info, warn};

use crate::config::subsystems::{EmbeddingConfig, EmbeddingProviderKind};
use crate::error::Result;

pub use self::hash::HashEmbedder;
pub use self::http::HttpEmbeddings;
pub use self::precomputed::PrecomputedEmbeddings;

/// The two capabilities the semantic matcher needs from an embedding model:
/// encode text into a fixed-size vector, one at a time or batched.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Results are in input order.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Cosine similarity in [-1, 1]. Mismatched or zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Top-`k` corpus entries by cosine similarity to `query`, best first. Equal
/// scores keep the lower corpus index first.
pub fn nearest(query: &[f32], corpus: &[Vec<f32>], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = corpus
        .iter()
        .enumerate()
        .map(|(index, vector)| (index, cosine_similarity(query, vector)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}

/// Builds the configured provider. `Ok(None)` means semantic matching is
/// disabled, including when the provider cannot be constructed.
pub fn build_provider(config: &EmbeddingConfig) -> Result<Option<Box<dyn EmbeddingProvider>>> {
    match config.provider {
        EmbeddingProviderKind::None => {
            info!("Embedding provider disabled");
            Ok(None)
        },
        EmbeddingProviderKind::Hash => {
            info!("Using hashing embedder with {} dimensions", config.dimensions);
            Ok(Some(Box::new(HashEmbedder::new(config.dimensions, config.seed))))
        },
        EmbeddingProviderKind::Precomputed => {
            let Some(path) = &config.vectors_file else {
                warn!("Precomputed embeddings requested without vectors_file; semantic matching disabled");
                return Ok(None);
            };
            match PrecomputedEmbeddings::load(path) {
                Ok(provider) => Ok(Some(Box::new(provider))),
                Err(e) => {
                    warn!("Embedding provider unavailable ({}); semantic matching disabled", e);
                    Ok(None)
                }
            }
        },
        EmbeddingProviderKind::Http => match HttpEmbeddings::from_config(config) {
            Ok(provider) => Ok(Some(Box::new(provider))),
            Err(e) => {
                warn!("Embedding provider unavailable ({}); semantic matching disabled", e);
                Ok(None)
            }
        },
    }
}
