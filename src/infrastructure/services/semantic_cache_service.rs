//! Semantic search-result caching service
//!
//! Composes the vector index, the entry mapping and the payload store
//! into `lookup` / `insert`, and owns the crash-consistency contract
//! between the three on-disk artifacts:
//!
//! - insert order: payload file, then embed, then index row, then
//!   mapping entry; persistence checkpoints the index *before* flushing
//!   the mapping, so after a crash the mapping is always the smaller,
//!   authoritative side.
//! - startup reconcile: any index row whose id has no mapping entry is
//!   pruned (never the reverse), restoring the id-set equality
//!   invariant without surfacing an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::{CacheError, CacheOutcome, Entry, EntryId, PayloadKey, PayloadRecord};
use crate::infrastructure::index::FlatVectorIndex;
use crate::infrastructure::mapping::EntryMapping;
use crate::infrastructure::payload::PayloadStore;

/// File names of the two durable artifacts inside the cache directory.
pub const INDEX_FILE: &str = "index.bin";
pub const MAPPING_FILE: &str = "mapping.json";

/// The cache handle: one per process, constructed at startup and shared
/// by reference. Mutable state sits behind a single async mutex, which
/// is the single-writer boundary the on-disk format requires.
#[derive(Debug)]
pub struct SemanticCacheService {
    provider: Arc<dyn EmbeddingProvider>,
    store: PayloadStore,
    state: Mutex<CacheState>,
    similarity_threshold: f32,
    index_path: PathBuf,
    mapping_path: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug)]
struct CacheState {
    index: FlatVectorIndex,
    mapping: EntryMapping,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub directory: PathBuf,
    pub similarity_threshold: f32,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;

        if total == 0 {
            return 0.0;
        }

        self.hits as f32 / total as f32
    }
}

impl SemanticCacheService {
    /// Open (or create) the cache rooted at `config.dir`.
    ///
    /// Missing artifacts yield an empty cache; unreadable ones are
    /// logged and reset. Deleting the whole directory is the documented
    /// full-reset procedure and lands here as the fresh-cache path.
    pub async fn open(
        config: &CacheConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, CacheError> {
        if provider.dimensions() != config.dimension {
            return Err(CacheError::configuration(format!(
                "embedding provider produces {}-dim vectors, cache configured for {}",
                provider.dimensions(),
                config.dimension
            )));
        }

        fs::create_dir_all(&config.dir)?;
        let store = PayloadStore::open(&config.dir)?;
        let index_path = config.dir.join(INDEX_FILE);
        let mapping_path = config.dir.join(MAPPING_FILE);

        let mut mapping = load_mapping(&mapping_path);
        let mut index = load_index(&index_path, config.dimension);

        if index.dimension() != config.dimension {
            // An embedder swap invalidates every stored similarity; the
            // old checkpoint cannot be interpreted under the new model.
            error!(
                found = index.dimension(),
                configured = config.dimension,
                "index checkpoint dimension does not match configuration, resetting cache"
            );
            index = FlatVectorIndex::new(config.dimension);
            mapping = EntryMapping::new();
            index.save(&index_path)?;
            mapping.flush(&mapping_path)?;
        }

        let service = Self {
            provider,
            store,
            state: Mutex::new(CacheState { index, mapping }),
            similarity_threshold: config.similarity_threshold,
            index_path,
            mapping_path,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };

        service.reconcile().await?;

        Ok(service)
    }

    /// Restore the id-set equality invariant after an unclean shutdown.
    async fn reconcile(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;

        let known = state.mapping.ids();
        let pruned = state.index.retain_ids(&known);
        if pruned > 0 {
            warn!(
                pruned,
                "pruned index vectors with no mapping entry (interrupted insert)"
            );
            state.index.save(&self.index_path)?;
        }

        // The commit order makes entries without vectors unreachable in
        // normal operation; they are left in place but can never match.
        let orphaned = state.mapping.len() - state.index.len().min(state.mapping.len());
        if orphaned > 0 {
            warn!(orphaned, "mapping entries have no index vector");
        }

        debug!(
            vectors = state.index.len(),
            entries = state.mapping.len(),
            "cache state reconciled"
        );

        Ok(())
    }

    /// Look up a semantically similar prior query using the configured
    /// similarity threshold.
    pub async fn lookup(&self, query: &str) -> Result<CacheOutcome, CacheError> {
        self.lookup_with_threshold(query, self.similarity_threshold)
            .await
    }

    /// Look up with an explicit threshold.
    ///
    /// The threshold is compared against cosine similarity in
    /// `[-1, 1]`. Embedding failures propagate (callers treat them as
    /// an unconditional miss); every cache-internal inconsistency
    /// degrades to `Miss` - the cache never blocks the live-fetch
    /// fallback.
    pub async fn lookup_with_threshold(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<CacheOutcome, CacheError> {
        let request = EmbeddingRequest::query(self.provider.default_model(), query);
        let embedding = self.provider.embed(request).await?;

        let state = self.state.lock().await;
        let results = state.index.search(embedding.values(), 1)?;

        let Some(&(id, similarity)) = results.first() else {
            return Ok(self.record_miss("index empty"));
        };

        if similarity < threshold {
            debug!(similarity, threshold, "best match below threshold");
            return Ok(self.record_miss("below threshold"));
        }

        match Self::resolve(&state, &self.store, id) {
            Ok(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(id, similarity, "cache hit");
                Ok(CacheOutcome::Hit {
                    payload,
                    entry_id: id,
                    similarity,
                })
            }
            Err(e) if e.is_recoverable_inconsistency() => {
                warn!(id, error = %e, "inconsistent cache state, degrading to miss");
                Ok(self.record_miss("inconsistent state"))
            }
            Err(e) => {
                warn!(id, error = %e, "failed to resolve hit, degrading to miss");
                Ok(self.record_miss("resolution failure"))
            }
        }
    }

    fn resolve(
        state: &CacheState,
        store: &PayloadStore,
        id: EntryId,
    ) -> Result<PayloadRecord, CacheError> {
        let entry = state.mapping.get(id)?;
        store.read(entry.payload_key())
    }

    fn record_miss(&self, reason: &str) -> CacheOutcome {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(reason, "cache miss");
        CacheOutcome::Miss
    }

    /// Commit a freshly fetched result set for `query`.
    ///
    /// Called by the owner of the live fetch after a `Miss`. The
    /// payload lands on disk before any index mutation; an embedding
    /// failure aborts the insert and leaves at most a harmless
    /// content-addressed orphan file. Re-inserting the same literal
    /// query deterministically appends a second, independently valid
    /// entry sharing the same payload file.
    pub async fn insert(
        &self,
        query: &str,
        data: serde_json::Value,
    ) -> Result<Entry, CacheError> {
        let key = PayloadKey::from_query(query);
        let record = PayloadRecord::new(data, query);
        self.store.write(&key, &record)?;

        // Both sides of the index embed with the query task type: under
        // an asymmetric retrieval model a document-task vector for the
        // same text differs, and a stored query would no longer match
        // itself at lookup time.
        let request = EmbeddingRequest::query(self.provider.default_model(), query);
        let embedding = self.provider.embed(request).await?;

        let mut state = self.state.lock().await;

        let id = state.mapping.next_id();
        state.index.add(id, embedding.into_values())?;
        let entry = state.mapping.append(query, key);

        // Index checkpoint first, mapping flush last: the mapping flush
        // is the durable commit point, and a crash in between leaves
        // only a prunable dangling vector, never a dangling entry.
        state.index.save(&self.index_path)?;
        state.mapping.flush(&self.mapping_path)?;

        info!(id = entry.id(), entries = state.mapping.len(), "cached search result");

        Ok(entry)
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;

        CacheStats {
            entries: state.mapping.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            directory: self.store.dir().to_path_buf(),
            similarity_threshold: self.similarity_threshold,
        }
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    pub fn directory(&self) -> &Path {
        self.store.dir()
    }
}

fn load_mapping(path: &Path) -> EntryMapping {
    if !path.exists() {
        return EntryMapping::new();
    }

    match EntryMapping::load(path) {
        Ok(mapping) => mapping,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable mapping file, starting empty");
            EntryMapping::new()
        }
    }
}

fn load_index(path: &Path, dimension: usize) -> FlatVectorIndex {
    if !path.exists() {
        return FlatVectorIndex::new(dimension);
    }

    match FlatVectorIndex::load(path) {
        Ok(index) => index,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable index checkpoint, starting empty");
            FlatVectorIndex::new(dimension)
        }
    }
}
