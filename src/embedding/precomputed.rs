use std::collections::HashMap;
use std::fs;
use std::path::Path;
use ahash::AHashMap;
use log::info;

use crate::error::{Error, Result};
use super::EmbeddingProvider;

/// Vectors produced offline by an external model, stored as a JSON object
/// mapping each text to its vector.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedEmbeddings {
    vectors: AHashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl PrecomputedEmbeddings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::embedding(format!("cannot read {:?}: {}", path, e)))?;
        let vectors: HashMap<String, Vec<f32>> = serde_json::from_str(&content)?;
        let provider = Self::from_vectors(vectors.into_iter().collect())?;
        info!(
            "Loaded {} precomputed embeddings ({} dimensions) from {:?}",
            provider.vectors.len(),
            provider.dimensions,
            path
        );
        Ok(provider)
    }

    /// All vectors must share one dimensionality.
    pub fn from_vectors(vectors: AHashMap<String, Vec<f32>>) -> Result<Self> {
        let mut dimensions = None;
        for (text, vector) in &vectors {
            match dimensions {
                None => dimensions = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(Error::embedding(format!(
                        "vector for {:?} has {} dimensions, expected {}",
                        text,
                        vector.len(),
                        d
                    )));
                },
                Some(_) => {},
            }
        }
        Ok(Self {
            vectors,
            dimensions: dimensions.unwrap_or(0),
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl EmbeddingProvider for PrecomputedEmbeddings {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| Error::embedding(format!("no precomputed vector for {:?}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_looks_up_vectors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hello": [1.0, 0.0], "world": [0.0, 1.0]}}"#).unwrap();

        let provider = PrecomputedEmbeddings::load(file.path()).unwrap();
        assert_eq!(provider.len(), 2);
        assert_eq!(provider.encode("hello").unwrap(), vec![1.0, 0.0]);
        assert!(provider.encode("missing").is_err());
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let mut vectors = AHashMap::new();
        vectors.insert("a".to_string(), vec![1.0]);
        vectors.insert("b".to_string(), vec![1.0, 2.0]);
        assert!(PrecomputedEmbeddings::from_vectors(vectors).is_err());
    }
}
