//! Cache entry and payload domain types

mod key;

pub use key::PayloadKey;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonically allocated entry identifier. Never reused.
pub type EntryId = u64;

/// Durable record linking an entry id to its query text and payload.
///
/// The query text is kept for observability only; the similarity
/// decision runs purely on the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    id: EntryId,
    query_text: String,
    payload_key: PayloadKey,
}

impl Entry {
    pub fn new(id: EntryId, query_text: impl Into<String>, payload_key: PayloadKey) -> Self {
        Self {
            id,
            query_text: query_text.into(),
            payload_key,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn payload_key(&self) -> &PayloadKey {
        &self.payload_key
    }
}

/// The cached result set as it lands on disk: the opaque fetched data
/// plus the query that produced it and when it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadRecord {
    data: serde_json::Value,
    original_query: String,
    fetched_at: DateTime<Utc>,
}

impl PayloadRecord {
    pub fn new(data: serde_json::Value, original_query: impl Into<String>) -> Self {
        Self {
            data,
            original_query: original_query.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Provenance of a payload handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheStatus {
    /// Resolved from a prior entry; carries the similarity of the match.
    ServedFromCache { similarity: f32 },
    /// The caller performed a live fetch for this payload.
    FreshlyFetched,
}

/// Outcome of a similarity-gated lookup.
#[derive(Debug, Clone)]
pub enum CacheOutcome {
    Hit {
        payload: PayloadRecord,
        entry_id: EntryId,
        similarity: f32,
    },
    Miss,
}

impl CacheOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    pub fn status(&self) -> CacheStatus {
        match self {
            Self::Hit { similarity, .. } => CacheStatus::ServedFromCache {
                similarity: *similarity,
            },
            Self::Miss => CacheStatus::FreshlyFetched,
        }
    }

    /// The payload, if this was a hit.
    pub fn into_payload(self) -> Option<PayloadRecord> {
        match self {
            Self::Hit { payload, .. } => Some(payload),
            Self::Miss => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_accessors() {
        let key = PayloadKey::from_query("latest score");
        let entry = Entry::new(3, "latest score", key.clone());

        assert_eq!(entry.id(), 3);
        assert_eq!(entry.query_text(), "latest score");
        assert_eq!(entry.payload_key(), &key);
    }

    #[test]
    fn test_payload_record_roundtrip() {
        let record = PayloadRecord::new(
            serde_json::json!({"summary": "Team A won 2-1"}),
            "score of yesterday's match",
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: PayloadRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back, record);
        assert_eq!(back.original_query(), "score of yesterday's match");
    }

    #[test]
    fn test_outcome_status() {
        let record = PayloadRecord::new(serde_json::json!({}), "q");
        let hit = CacheOutcome::Hit {
            payload: record,
            entry_id: 0,
            similarity: 0.97,
        };

        assert!(hit.is_hit());
        match hit.status() {
            CacheStatus::ServedFromCache { similarity } => {
                assert!((similarity - 0.97).abs() < 1e-6)
            }
            CacheStatus::FreshlyFetched => panic!("expected served-from-cache"),
        }

        let miss = CacheOutcome::Miss;
        assert!(miss.is_miss());
        assert_eq!(miss.status(), CacheStatus::FreshlyFetched);
        assert!(miss.into_payload().is_none());
    }
}
