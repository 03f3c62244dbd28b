// Embedding Client (C2): normalizes text and calls an external embedding
// model over HTTP, returning a fixed-dimension vector. The request/response
// shape and bearer-auth header pattern are grounded in
// everruns-worker::providers::openai::OpenAiProvider; unlike that provider
// this one talks to a single fixed endpoint and never streams.

use std::time::Duration;

use async_trait::async_trait;
use gateway_core::traits::{EmbeddingError, EmbeddingProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub request_timeout: Duration,
}

impl EmbeddingClientConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("EMBEDDING_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8081/v1/embeddings".to_string()),
            api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1536),
            request_timeout: Duration::from_millis(
                std::env::var("EMBEDDING_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5_000),
            ),
        }
    }
}

pub struct HttpEmbeddingClient {
    client: Client,
    config: EmbeddingClientConfig,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// Collapses whitespace and truncates to a sane size before hashing or
    /// sending upstream, so cache keys are stable across cosmetic variance
    /// in the caller's input text.
    pub fn normalize(text: &str) -> String {
        const MAX_CHARS: usize = 8_000;
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(MAX_CHARS).collect()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let normalized = Self::normalize(text);

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: &normalized,
            });
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else {
                EmbeddingError::Upstream(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Upstream(format!("{status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Upstream("embedding response had no data".to_string()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            HttpEmbeddingClient::normalize("  too \n much   whitespace "),
            "too much whitespace"
        );
    }

    #[test]
    fn normalize_truncates_very_long_input() {
        let long = "a".repeat(20_000);
        assert_eq!(HttpEmbeddingClient::normalize(&long).len(), 8_000);
    }

    #[tokio::test]
    async fn embed_parses_first_data_entry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]})),
            )
            .mount(&server)
            .await;

        let client = HttpEmbeddingClient::new(EmbeddingClientConfig {
            endpoint: format!("{}/v1/embeddings", server.uri()),
            api_key: None,
            model: "test-model".to_string(),
            dimension: 3,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();

        let embedding = client.embed("hello world").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_surfaces_upstream_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let client = HttpEmbeddingClient::new(EmbeddingClientConfig {
            endpoint: format!("{}/v1/embeddings", server.uri()),
            api_key: None,
            model: "test-model".to_string(),
            dimension: 3,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();

        let err = client.embed("hello world").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Upstream(_)));
    }
}
