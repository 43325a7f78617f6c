//! Topic provenance tracking
//!
//! Derived topic names are not unique across the tree: two parents can both
//! produce a child called "History". The tracker remembers which topic a
//! display name was generated from so image lookups and content context
//! resolve against a stable key.
//!
//! A name that was never recorded is its own origin.

use dashmap::DashMap;

/// Display name → origin topic map
///
/// Shared process state; per-key operations are atomic and concurrent
/// writes to the same key are last-write-wins.
#[derive(Debug, Default)]
pub struct ProvenanceTracker {
    origins: DashMap<String, String>,
}

impl ProvenanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the origin of `topic`
    pub fn record(&self, topic: impl Into<String>, origin: impl Into<String>) {
        self.origins.insert(topic.into(), origin.into());
    }

    /// Origin of `topic`, or `topic` itself when unrecorded
    pub fn resolve(&self, topic: &str) -> String {
        self.origins
            .get(topic)
            .map(|origin| origin.value().clone())
            .unwrap_or_else(|| topic.to_string())
    }

    /// Forget every recorded origin (tree reset)
    pub fn clear(&self) {
        self.origins.clear();
        tracing::info!("Topic provenance cleared");
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}
