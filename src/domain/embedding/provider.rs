//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{Embedding, EmbeddingRequest};
use crate::domain::CacheError;

/// Trait for embedding providers (Gemini, OpenAI, etc.)
///
/// The cache treats this as an opaque, fallible function from text to
/// vector. Failures are transient by contract and must surface as
/// `CacheError::EmbeddingUnavailable`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate an embedding for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<Embedding, CacheError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Default model identifier for this provider
    fn default_model(&self) -> &str;

    /// Dimensionality of the vectors this provider produces
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::embedding::l2_normalize;

    /// Deterministic in-process provider for tests.
    ///
    /// Scripted texts return their fixed vectors; anything else gets a
    /// hash-derived vector, so distinct texts are stably distinct.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        name: &'static str,
        model: String,
        dimensions: usize,
        fixed: HashMap<String, Vec<f32>>,
        error: Option<String>,
    }

    impl MockEmbeddingProvider {
        pub fn new(name: &'static str, dimensions: usize) -> Self {
            Self {
                name,
                model: "mock-embedding".to_string(),
                dimensions,
                fixed: HashMap::new(),
                error: None,
            }
        }

        /// Script the exact vector a text should embed to.
        pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            assert_eq!(vector.len(), self.dimensions, "scripted vector dimension");
            self.fixed.insert(text.into(), vector);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<Embedding, CacheError> {
            if let Some(ref error) = self.error {
                return Err(CacheError::embedding_unavailable(error));
            }

            if let Some(vector) = self.fixed.get(request.text()) {
                return Ok(Embedding::new(vector.clone()));
            }

            let hash = request
                .text()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let mut vector: Vec<f32> = (0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                .collect();
            l2_normalize(&mut vector);

            Ok(Embedding::new(vector))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn default_model(&self) -> &str {
            &self.model
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new("test", 8);

            let a = provider
                .embed(EmbeddingRequest::query("mock-embedding", "hello"))
                .await
                .unwrap();
            let b = provider
                .embed(EmbeddingRequest::query("mock-embedding", "hello"))
                .await
                .unwrap();

            assert_eq!(a.values(), b.values());
            assert_eq!(a.dimensions(), 8);
        }

        #[tokio::test]
        async fn test_scripted_vector() {
            let provider = MockEmbeddingProvider::new("test", 3)
                .with_vector("latest score", vec![1.0, 0.0, 0.0]);

            let embedding = provider
                .embed(EmbeddingRequest::query("mock-embedding", "latest score"))
                .await
                .unwrap();

            assert_eq!(embedding.values(), &[1.0, 0.0, 0.0]);
        }

        #[tokio::test]
        async fn test_error_mode() {
            let provider = MockEmbeddingProvider::new("test", 8).with_error("API down");

            let result = provider
                .embed(EmbeddingRequest::query("mock-embedding", "hello"))
                .await;

            assert!(matches!(
                result,
                Err(CacheError::EmbeddingUnavailable { .. })
            ));
        }
    }
}
