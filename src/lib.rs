//! Semantic result cache for expensive web-search lookups.
//!
//! Queries are matched by embedding similarity rather than literal
//! text: a lookup embeds the query, searches a flat vector index over
//! every previously cached query, and serves the stored result set
//! when the best cosine similarity clears the configured threshold.
//! Misses are the caller's cue to run the live fetch and offer the
//! fresh result back via [`SemanticCacheService::insert`].
//!
//! The cache is append-only and entries never expire. State lives in a
//! single directory: a binary index checkpoint, a JSON entry mapping
//! and one content-addressed JSON payload file per distinct query.
//! Deleting the directory is the supported full reset.
//!
//! ```no_run
//! use semantic_search_cache::{AppConfig, CacheOutcome, open_cache};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let cache = open_cache(&config).await?;
//!
//! match cache.lookup("latest football scores").await? {
//!     CacheOutcome::Hit { payload, .. } => println!("{}", payload.data()),
//!     CacheOutcome::Miss => {
//!         // run the live fetch, then:
//!         // cache.insert("latest football scores", fresh_results).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

pub use config::{AppConfig, CacheConfig, EmbeddingConfig, LogFormat, LoggingConfig};
pub use domain::{
    CacheError, CacheOutcome, CacheStatus, Entry, EntryId, LiveFetcher, PayloadKey, PayloadRecord,
};
pub use infrastructure::embedding::GeminiEmbeddingProvider;
pub use infrastructure::logging::init_logging;
pub use infrastructure::services::{CacheStats, SemanticCacheService};

use infrastructure::http::HttpClient;

/// Open the cache described by `config`, backed by the Gemini
/// embedding API.
pub async fn open_cache(config: &AppConfig) -> Result<SemanticCacheService, CacheError> {
    let mut provider = GeminiEmbeddingProvider::with_model(
        HttpClient::new(),
        &config.embedding.api_key,
        &config.embedding.model,
        config.cache.dimension,
    );

    if let Some(base_url) = &config.embedding.base_url {
        provider = provider.with_base_url(base_url);
    }

    SemanticCacheService::open(&config.cache, Arc::new(provider)).await
}
