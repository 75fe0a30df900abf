//! Embedding request types

use serde::{Deserialize, Serialize};

/// Task hint forwarded to the embedding provider.
///
/// Query-time and document-time embeddings may differ for providers
/// that train asymmetric retrieval heads. The cache embeds both sides
/// of its index with the query task so identical text always maps to
/// the identical vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmbeddingTaskType {
    RetrievalQuery,
    RetrievalDocument,
}

impl EmbeddingTaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
        }
    }
}

/// Request to embed a single text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    model: String,
    text: String,
    task_type: EmbeddingTaskType,
}

impl EmbeddingRequest {
    pub fn new(
        model: impl Into<String>,
        text: impl Into<String>,
        task_type: EmbeddingTaskType,
    ) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
            task_type,
        }
    }

    /// Request with the retrieval-query task hint.
    pub fn query(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(model, text, EmbeddingTaskType::RetrievalQuery)
    }

    /// Request with the retrieval-document task hint.
    pub fn document(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(model, text, EmbeddingTaskType::RetrievalDocument)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn task_type(&self) -> EmbeddingTaskType {
        self.task_type
    }
}
