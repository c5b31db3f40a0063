use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use rayon::prelude::*;

use crate::error::Result;
use super::EmbeddingProvider;

/// Feature-hashing embedder over character unigrams and bigrams.
///
/// Dialogue in the corpora is mostly Japanese, which has no whitespace to
/// split on, so characters are the unit. Output is L2-normalised and fully
/// deterministic for a given `(dimensions, seed)`.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    seed: u64,
}

impl HashEmbedder {
    pub fn new(dimensions: usize, seed: u64) -> Self {
        Self {
            dimensions: dimensions.max(1),
            seed,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let chars: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        for c in &chars {
            vector[self.bucket_for(&[*c])] += 1.0;
        }
        for pair in chars.windows(2) {
            vector[self.bucket_for(pair)] += 1.0;
        }
        normalize(&mut vector);
        vector
    }

    fn bucket_for(&self, feature: &[char]) -> usize {
        let mut hasher = DefaultHasher::new();
        hasher.write_u64(self.seed);
        feature.hash(&mut hasher);
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // par_iter().collect() keeps input order
        Ok(texts.par_iter().map(|text| self.embed_text(text)).collect())
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn identical_text_scores_one() {
        let embedder = HashEmbedder::new(128, 7);
        let a = embedder.embed_text("そうか、わかった。");
        let b = embedder.embed_text("そうか、わかった。");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn similar_text_beats_unrelated_text() {
        let embedder = HashEmbedder::new(256, 1337);
        let query = embedder.embed_text("わ、すっごく良い絵が撮れそう");
        let close = embedder.embed_text("わ、すっごく良い絵が撮れそう❤");
        let far = embedder.embed_text("戦闘準備を整えろ");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn batch_matches_single_encoding() {
        let embedder = HashEmbedder::new(64, 1);
        let texts = vec!["one".to_string(), "two".to_string(), "".to_string()];
        let batch = embedder.encode_batch(&texts).unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&embedder.encode(text).unwrap(), vector);
        }
        assert!(batch[2].iter().all(|v| *v == 0.0));
    }
}
