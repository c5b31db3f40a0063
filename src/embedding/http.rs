use std::env;
use std::time::Duration;
use log::{debug, info};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::subsystems::EmbeddingConfig;
use crate::error::{Error, Result};
use super::EmbeddingProvider;

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddings {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl HttpEmbeddings {
    /// Fails when the configured key variable is not set.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(name) => Some(env::var(name).map_err(|_| {
                Error::embedding(format!("{} is required for http embeddings", name))
            })?),
            None => None,
        };
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        info!("Using embeddings service {} with model {}", config.endpoint, config.model);
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            batch_size: config.batch_size.max(1),
        })
    }

    fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });
        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "embeddings request failed: {}",
                response.status()
            )));
        }
        let body = response.text()?;
        parse_response(&body, inputs.len())
    }
}

/// Vectors in input order. Entries are placed by their `index` field when the
/// service sends one.
pub fn parse_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)?;
    if parsed.data.len() != expected {
        return Err(Error::embedding(format!(
            "embeddings service returned {} vectors for {} inputs",
            parsed.data.len(),
            expected
        )));
    }
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, data) in parsed.data.into_iter().enumerate() {
        let index = data.index.unwrap_or(position);
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(data.embedding),
            _ => {
                return Err(Error::embedding(format!(
                    "embeddings service returned a duplicate or out of range index {}",
                    index
                )))
            }
        }
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| Error::embedding("embeddings service skipped an input")))
        .collect()
}

impl EmbeddingProvider for HttpEmbeddings {
    fn name(&self) -> &str {
        "http"
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("embeddings service returned no vector"))
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            debug!("Requesting {} embeddings", chunk.len());
            vectors.extend(self.request(chunk)?);
        }
        Ok(vectors)
    }
}
