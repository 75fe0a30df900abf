//! Domain layer - Core types, traits and errors

pub mod cache;
pub mod embedding;
pub mod error;
pub mod fetch;

pub use cache::{CacheOutcome, CacheStatus, Entry, EntryId, PayloadKey, PayloadRecord};
pub use embedding::{Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingTaskType};
pub use error::CacheError;
pub use fetch::LiveFetcher;
