//! Live-fetch collaborator interface
//!
//! The cache never fetches anything itself. On a miss the caller runs
//! the live fetch (web search, scrape, API call) through this trait and
//! then offers the result back via `insert`.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::CacheError;

/// External collaborator that produces a fresh result set for a query.
#[async_trait]
pub trait LiveFetcher: Send + Sync + Debug {
    /// Perform a live fetch. Errors surface as `CacheError::FetchFailed`.
    async fn fetch(&self, query: &str) -> Result<serde_json::Value, CacheError>;
}
