#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{Result, ReviewerError};

/// Client for the OpenAI embeddings API.
///
/// Construction fails when no API key is configured: an index built with
/// missing or wrong embeddings would silently corrupt all later retrieval, so
/// unlike generation this never degrades.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    api_base: Url,
    api_key: String,
    model: String,
    batch_size: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.llm.openai_api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ReviewerError::Authentication(
                "OPENAI_API_KEY is required to initialize the embedding model".to_string(),
            ));
        }

        let api_base = Url::parse(&config.embedding.api_base).map_err(|_| {
            ReviewerError::Config(format!(
                "Invalid embedding API base URL: {}",
                config.embedding.api_base
            ))
        })?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.llm.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            api_base,
            api_key,
            model: config.embedding.model.clone(),
            batch_size: config.embedding.batch_size,
            agent,
        })
    }

    /// Embedding model identifier this client was configured with
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate embeddings for multiple texts, one vector per input in the
    /// same order, batched to keep request bodies bounded.
    #[inline]
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            vectors.extend(self.embed_batch(batch)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    /// Generate an embedding for a single query text
    #[inline]
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string()))?;
        vectors.pop().ok_or_else(|| {
            ReviewerError::Embedding("Embedding backend returned no vectors".to_string())
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .api_base
            .join("/v1/embeddings")
            .map_err(|e| ReviewerError::Config(format!("Failed to build embeddings URL: {}", e)))?;

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            ReviewerError::Embedding(format!("Failed to serialize embeddings request: {}", e))
        })?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| ReviewerError::Network(format!("Embedding request failed: {}", e)))?;

        let mut response: EmbeddingsResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                ReviewerError::Embedding(format!("Failed to parse embeddings response: {}", e))
            })?;

        if response.data.len() != texts.len() {
            return Err(ReviewerError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API may return items out of order; `index` is authoritative
        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}
