//! Embedding domain models and traits

mod provider;
mod request;
mod response;

pub use provider::EmbeddingProvider;
pub use request::{EmbeddingRequest, EmbeddingTaskType};
pub use response::{Embedding, cosine_similarity, inner_product, l2_normalize};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
