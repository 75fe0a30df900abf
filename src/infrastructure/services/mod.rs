mod semantic_cache_service;

pub use semantic_cache_service::{
    CacheStats, INDEX_FILE, MAPPING_FILE, SemanticCacheService,
};
