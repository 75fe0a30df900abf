//! Gemini embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::CacheError;
use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest};
use crate::infrastructure::http::HttpClientTrait;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini embedding model and its dimensionality.
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Gemini embedding provider
#[derive(Debug)]
pub struct GeminiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl<C: HttpClientTrait> GeminiEmbeddingProvider<C> {
    /// Create a new provider for the default embedding model.
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_model(
            client,
            api_key,
            DEFAULT_EMBEDDING_MODEL,
            DEFAULT_EMBEDDING_DIM,
        )
    }

    /// Create a provider for a specific model and dimensionality.
    pub fn with_model(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: model.into(),
            dimensions,
        }
    }

    /// Override the API base URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn embed_url(&self, model: &str) -> String {
        format!("{}/v1beta/{}:embedContent", self.base_url, model)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-goog-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &EmbeddingRequest) -> serde_json::Value {
        serde_json::json!({
            "content": { "parts": [ { "text": request.text() } ] },
            "taskType": request.task_type().as_str(),
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Embedding, CacheError> {
        let response: GeminiEmbedResponse = serde_json::from_value(json).map_err(|e| {
            CacheError::embedding_unavailable(format!("Failed to parse embedding response: {}", e))
        })?;

        if response.embedding.values.is_empty() {
            return Err(CacheError::embedding_unavailable(
                "No embedding values returned",
            ));
        }

        Ok(Embedding::new(response.embedding.values))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for GeminiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<Embedding, CacheError> {
        let url = self.embed_url(request.model());
        let body = self.build_request(&request);

        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// Gemini API types for embeddings

#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiEmbedding,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::mock::MockHttpClient;

    const TEST_URL: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/embedding-001:embedContent";

    fn mock_response(dimensions: usize) -> serde_json::Value {
        let values: Vec<f32> = (0..dimensions).map(|i| i as f32 * 0.001).collect();
        serde_json::json!({ "embedding": { "values": values } })
    }

    #[tokio::test]
    async fn test_embed_query() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(768));
        let provider = GeminiEmbeddingProvider::new(client, "test-api-key");

        let request = EmbeddingRequest::query("models/embedding-001", "latest cricket score");
        let embedding = provider.embed(request).await.unwrap();

        assert_eq!(embedding.dimensions(), 768);
    }

    #[tokio::test]
    async fn test_request_body_carries_task_type() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(768));
        let provider = GeminiEmbeddingProvider::new(client, "test-api-key");

        let request = EmbeddingRequest::document("models/embedding-001", "some document");
        provider.embed(request).await.unwrap();

        let recorded = provider.client.recorded_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(recorded[0].1["content"]["parts"][0]["text"], "some document");
    }

    #[tokio::test]
    async fn test_embed_error_is_transient() {
        let client = MockHttpClient::new().with_error(TEST_URL, "Rate limit exceeded");
        let provider = GeminiEmbeddingProvider::new(client, "test-api-key");

        let request = EmbeddingRequest::query("models/embedding-001", "hello");
        let result = provider.embed(request).await;

        assert!(matches!(
            result,
            Err(CacheError::EmbeddingUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_embedding_rejected() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({"embedding": {"values": []}}));
        let provider = GeminiEmbeddingProvider::new(client, "test-api-key");

        let request = EmbeddingRequest::query("models/embedding-001", "hello");
        let result = provider.embed(request).await;

        assert!(matches!(
            result,
            Err(CacheError::EmbeddingUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let custom_url = "http://localhost:8080/v1beta/models/embedding-001:embedContent";
        let client = MockHttpClient::new().with_response(custom_url, mock_response(768));
        let provider = GeminiEmbeddingProvider::new(client, "test-key")
            .with_base_url("http://localhost:8080/");

        let request = EmbeddingRequest::query("models/embedding-001", "hello");
        let embedding = provider.embed(request).await.unwrap();

        assert_eq!(embedding.dimensions(), 768);
    }

    #[test]
    fn test_provider_info() {
        let provider = GeminiEmbeddingProvider::new(MockHttpClient::new(), "test-key");

        assert_eq!(provider.provider_name(), "gemini");
        assert_eq!(provider.default_model(), "models/embedding-001");
        assert_eq!(provider.dimensions(), 768);
    }
}
