//! Deterministic payload key derivation

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content address for a cached payload, derived from the raw query text.
///
/// The same literal query always maps to the same key, so repeated
/// writes of one query are idempotent at the storage layer. The hex
/// form is filesystem-safe and is used directly as the payload file
/// stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadKey(String);

impl PayloadKey {
    /// Derive the key for a query string.
    pub fn from_query(query: &str) -> Self {
        let digest = Sha256::digest(query.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the payload this key addresses.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = PayloadKey::from_query("score of yesterday's match");
        let b = PayloadKey::from_query("score of yesterday's match");

        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_queries_distinct_keys() {
        let a = PayloadKey::from_query("score of yesterday's match");
        let b = PayloadKey::from_query("history of the 1998 World Cup");

        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = PayloadKey::from_query("hello");

        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_name() {
        let key = PayloadKey::from_query("hello");
        assert_eq!(key.file_name(), format!("{}.json", key.as_str()));
    }
}
