// src/config/subsystems/embedding.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingProviderKind {
    Hash,
    Precomputed,
    Http,
    None,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProviderKind::Hash => "hash",
            EmbeddingProviderKind::Precomputed => "precomputed",
            EmbeddingProviderKind::Http => "http",
            EmbeddingProviderKind::None => "none",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim_matches('"').to_lowercase().as_str() {
            "hash" => Some(Self::Hash),
            "precomputed" => Some(Self::Precomputed),
            "http" | "openai" => Some(Self::Http),
            "none" | "disabled" => Some(Self::None),
            _ => None,
        }
    }
}

impl Default for EmbeddingProviderKind {
    fn default() -> Self {
        Self::Hash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub dimensions: usize,
    pub seed: u64,
    /// JSON object of text -> vector, used by the precomputed provider.
    pub vectors_file: Option<PathBuf>,
    /// OpenAI-compatible `/embeddings` endpoint used by the http provider.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the bearer token. No auth header is sent
    /// when unset.
    pub api_key_env: Option<String>,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            dimensions: 256,
            seed: 1337,
            vectors_file: None,
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            batch_size: 256,
        }
    }
}

impl FromIni for EmbeddingConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "embedding" {
            return None;
        }

        match key {
            "provider" => {
                self.provider = match EmbeddingProviderKind::from_str(value) {
                    Some(kind) => kind,
                    None => return Some(Err(Error::Config(
                        format!("Invalid embedding provider: {}", value)
                    ))),
                };
                Some(Ok(()))
            },
            "dimensions" => {
                match value.parse::<usize>() {
                    Ok(dims) if dims > 0 => {
                        self.dimensions = dims;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid dimensions (must be > 0): {}", value)
                    ))),
                }
            },
            "seed" => {
                match value.parse::<u64>() {
                    Ok(seed) => {
                        self.seed = seed;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid seed: {}", value)
                    ))),
                }
            },
            "vectors_file" => {
                self.vectors_file = Some(PathBuf::from(value.trim_matches('"')));
                Some(Ok(()))
            },
            "endpoint" => {
                self.endpoint = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            "model" => {
                self.model = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            "api_key_env" => {
                let name = value.trim_matches('"');
                self.api_key_env = if name.is_empty() { None } else { Some(name.to_string()) };
                Some(Ok(()))
            },
            "batch_size" => {
                match value.parse::<usize>() {
                    Ok(size) if size > 0 => {
                        self.batch_size = size;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid batch_size (must be > 0): {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(Error::Config("dimensions must be greater than 0".to_string()));
        }
        if self.provider == EmbeddingProviderKind::Precomputed && self.vectors_file.is_none() {
            return Err(Error::Config(
                "the precomputed embedding provider needs vectors_file".to_string()
            ));
        }
        if self.provider == EmbeddingProviderKind::Http {
            if self.endpoint.is_empty() || self.model.is_empty() {
                return Err(Error::Config(
                    "the http embedding provider needs endpoint and model".to_string()
                ));
            }
            if self.batch_size == 0 {
                return Err(Error::Config("batch_size must be greater than 0".to_string()));
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.provider != EmbeddingProviderKind::None
    }
}
