//! Durable entry mapping with monotonic id allocation
//!
//! One JSON document holds the `next_id` counter and the full
//! id -> entry table. It is rewritten wholesale on every flush through
//! a temp-file-then-rename publish, so readers only ever observe a
//! complete document.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{CacheError, Entry, EntryId, PayloadKey};

/// Id allocator plus id -> (query text, payload key) table.
#[derive(Debug, Default)]
pub struct EntryMapping {
    next_id: EntryId,
    entries: BTreeMap<EntryId, Entry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MappingFile {
    next_id: EntryId,
    entries: BTreeMap<EntryId, StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    query_text: String,
    payload_key: PayloadKey,
}

impl EntryMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id the next `append` will allocate.
    pub fn next_id(&self) -> EntryId {
        self.next_id
    }

    pub fn ids(&self) -> HashSet<EntryId> {
        self.entries.keys().copied().collect()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: EntryId) -> Result<&Entry, CacheError> {
        self.entries.get(&id).ok_or(CacheError::UnknownId { id })
    }

    /// Allocate the next id and store a new entry under it.
    ///
    /// Ids are never reused, even though entries are never deleted in
    /// the current design; the counter only moves forward.
    pub fn append(&mut self, query_text: impl Into<String>, payload_key: PayloadKey) -> Entry {
        let id = self.next_id;
        let entry = Entry::new(id, query_text, payload_key);
        self.entries.insert(id, entry.clone());
        self.next_id += 1;

        entry
    }

    /// Atomically rewrite the mapping file.
    pub fn flush(&self, path: &Path) -> Result<(), CacheError> {
        let file = MappingFile {
            next_id: self.next_id,
            entries: self
                .entries
                .iter()
                .map(|(id, entry)| {
                    (
                        *id,
                        StoredEntry {
                            query_text: entry.query_text().to_string(),
                            payload_key: entry.payload_key().clone(),
                        },
                    )
                })
                .collect(),
        };

        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| CacheError::io(format!("Failed to serialize mapping: {}", e)))?;

        let tmp_path = temp_sibling(path);
        fs::write(&tmp_path, &bytes)?;
        File::open(&tmp_path)?.sync_all()?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Load a mapping file written by `flush`.
    ///
    /// A stale `next_id` (lower than an allocated id, possible after
    /// hand-edits or partial historical writes) is repaired forward so
    /// the monotonic-allocation invariant survives the reload.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let bytes = fs::read(path)?;
        let file: MappingFile = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::corrupt(format!("mapping file: {}", e)))?;

        let entries: BTreeMap<EntryId, Entry> = file
            .entries
            .into_iter()
            .map(|(id, stored)| (id, Entry::new(id, stored.query_text, stored.payload_key)))
            .collect();

        let min_next = entries.keys().next_back().map_or(0, |max| max + 1);
        let next_id = if file.next_id < min_next {
            warn!(
                stored = file.next_id,
                repaired = min_next,
                "mapping next_id behind max allocated id, repairing forward"
            );
            min_next
        } else {
            file.next_id
        };

        Ok(Self { next_id, entries })
    }
}

fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_allocates_monotonic_ids() {
        let mut mapping = EntryMapping::new();

        let a = mapping.append("first", PayloadKey::from_query("first"));
        let b = mapping.append("second", PayloadKey::from_query("second"));

        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(mapping.next_id(), 2);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_get_unknown_id() {
        let mapping = EntryMapping::new();

        let result = mapping.get(42);

        assert!(matches!(result, Err(CacheError::UnknownId { id: 42 })));
    }

    #[test]
    fn test_get_known_id() {
        let mut mapping = EntryMapping::new();
        let key = PayloadKey::from_query("latest score");
        mapping.append("latest score", key.clone());

        let entry = mapping.get(0).unwrap();

        assert_eq!(entry.query_text(), "latest score");
        assert_eq!(entry.payload_key(), &key);
    }

    #[test]
    fn test_flush_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");

        let mut mapping = EntryMapping::new();
        mapping.append("first", PayloadKey::from_query("first"));
        mapping.append("second", PayloadKey::from_query("second"));
        mapping.flush(&path).unwrap();

        let loaded = EntryMapping::load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.next_id(), 2);
        assert_eq!(loaded.get(1).unwrap().query_text(), "second");
    }

    #[test]
    fn test_flush_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");

        let mut mapping = EntryMapping::new();
        mapping.append("first", PayloadKey::from_query("first"));
        mapping.flush(&path).unwrap();

        mapping.append("second", PayloadKey::from_query("second"));
        mapping.flush(&path).unwrap();

        let loaded = EntryMapping::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_load_repairs_stale_next_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");

        let json = serde_json::json!({
            "next_id": 0,
            "entries": {
                "0": { "query_text": "q", "payload_key": "abc123" },
                "3": { "query_text": "r", "payload_key": "def456" }
            }
        });
        fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        let loaded = EntryMapping::load(&path).unwrap();

        assert_eq!(loaded.next_id(), 4);
        assert!(loaded.contains(3));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(&path, b"{ not json").unwrap();

        let result = EntryMapping::load(&path);

        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }
}
