//! Session-scoped deduplication index
//!
//! The feed re-renders posts it has already shown (re-ordering, partial
//! reloads, reposts), so identity is tracked for the whole crawl session and
//! never reset mid-crawl.

use std::collections::HashSet;

use super::record::IdentityKey;

/// Set of identity fingerprints already emitted in this session
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<[u8; 32]>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this identity was already recorded
    pub fn seen(&self, key: &IdentityKey<'_>) -> bool {
        self.seen.contains(&key.fingerprint())
    }

    /// Mark this identity as seen
    pub fn record(&mut self, key: &IdentityKey<'_>) {
        self.seen.insert(key.fingerprint());
    }

    /// Check-then-record in one step; `true` when the key was new
    pub fn insert_if_new(&mut self, key: &IdentityKey<'_>) -> bool {
        self.seen.insert(key.fingerprint())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
