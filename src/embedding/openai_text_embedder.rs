//! OpenAI API-based text embedder implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::{ApiKey, EmbeddingConfig};
use crate::embedding::text_embedder::TextEmbedder;
use crate::error::{IdiolinkError, Result};
use crate::vector::core::vector::Vector;

/// Request structure for the Embeddings API.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// Response structure from the Embeddings API.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Text embedder backed by an OpenAI compatible `/embeddings` endpoint.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use idiolink::config::{ApiKey, EmbeddingConfig};
/// use idiolink::embedding::openai_text_embedder::OpenAITextEmbedder;
/// use idiolink::embedding::text_embedder::TextEmbedder;
///
/// # async fn example() -> idiolink::error::Result<()> {
/// let embedder = OpenAITextEmbedder::new(
///     ApiKey::new("sk-...")?,
///     EmbeddingConfig::default(),
///     Duration::from_secs(60),
/// )?;
/// let vector = embedder.embed("kick the bucket").await?;
/// assert_eq!(vector.dimension(), embedder.dimension());
/// # Ok(())
/// # }
/// ```
pub struct OpenAITextEmbedder {
    client: Client,
    api_key: ApiKey,
    config: EmbeddingConfig,
    dimension: usize,
}

impl OpenAITextEmbedder {
    pub fn new(api_key: ApiKey, config: EmbeddingConfig, timeout: Duration) -> Result<Self> {
        let dimension = config
            .dimension
            .unwrap_or_else(|| Self::default_dimension(&config.model));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            config,
            dimension,
        })
    }

    /// Standard output dimension of the known models.
    fn default_dimension(model: &str) -> usize {
        match model {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }

    async fn request(&self, input: Vec<&str>) -> Result<Vec<Vector>> {
        let expected = input.len();
        let request = EmbeddingRequest {
            model: &self.config.model,
            input,
            dimensions: self.config.dimension,
        };

        let http_response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = http_response.status();
        let response_text = http_response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &response_text));
        }

        let response: EmbeddingResponse = serde_json::from_str(&response_text).map_err(|e| {
            IdiolinkError::embedding(format!(
                "Failed to parse embeddings response: {e}. Response text: {response_text}"
            ))
        })?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(IdiolinkError::embedding(format!(
                "Expected {expected} embeddings, got {}",
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| Vector::new(d.embedding)).collect())
    }
}

/// Rate limits and server errors are transient; other statuses are not.
fn status_error(status: StatusCode, body: &str) -> IdiolinkError {
    let message = format!("Embeddings API error (status {status}): {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        IdiolinkError::embedding(message)
    } else {
        IdiolinkError::invalid_config(message)
    }
}

#[async_trait]
impl TextEmbedder for OpenAITextEmbedder {
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.request(vec![text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IdiolinkError::embedding("No embedding in response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts.to_vec()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(config: EmbeddingConfig) -> OpenAITextEmbedder {
        OpenAITextEmbedder::new(ApiKey::new("sk-test").unwrap(), config, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_dimension_defaults() {
        assert_eq!(embedder(EmbeddingConfig::default()).dimension(), 1536);

        let large = EmbeddingConfig {
            model: "text-embedding-3-large".to_string(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(embedder(large).dimension(), 3072);

        let reduced = EmbeddingConfig {
            dimension: Some(256),
            ..EmbeddingConfig::default()
        };
        assert_eq!(embedder(reduced).dimension(), 256);
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let config = EmbeddingConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(embedder(config).endpoint(), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn test_status_classification() {
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(status_error(StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!status_error(StatusCode::UNAUTHORIZED, "").is_retryable());
    }

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: vec!["a", "b"],
            dimensions: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"model": "text-embedding-3-small", "input": ["a", "b"]})
        );
    }
}
