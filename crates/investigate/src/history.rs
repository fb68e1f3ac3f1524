use chrono::{DateTime, Utc};
use extract::{InvestigationResult, SourceReference};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::path::InvestigationPath;
use crate::store::HistoryStore;

/// A saved investigation, keyed by its root target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub target: String,
    pub investigation_path: InvestigationPath,
    pub results: InvestigationResult,
    #[serde(default)]
    pub sources: Vec<SourceReference>,
}

impl HistoryEntry {
    /// `None` for an empty path, which has no root to key on.
    pub fn new(
        path: InvestigationPath,
        results: InvestigationResult,
        sources: Vec<SourceReference>,
    ) -> Option<Self> {
        let root = path.root()?.to_string();
        Some(Self {
            id: root.clone(),
            timestamp: Utc::now().timestamp_millis(),
            target: root,
            investigation_path: path,
            results,
            sources,
        })
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Saved investigations, newest first, at most one per root target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        let mut history = Self::default();
        // Oldest first so the newest duplicate wins.
        for entry in entries.into_iter().rev() {
            history.upsert(entry);
        }
        history
    }

    /// Read the slot once. Unreadable history is discarded and the slot
    /// cleared; startup never fails on it.
    pub async fn load(store: &dyn HistoryStore) -> Self {
        match store.load().await {
            Ok(entries) => {
                let history = Self::new(entries);
                info!(entries = history.len(), "Loaded investigation history");
                history
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable investigation history");
                if let Err(e) = store.clear().await {
                    warn!(error = %e, "Failed to clear history slot");
                }
                Self::default()
            }
        }
    }

    /// Insert `entry` at the front, replacing any entry with the same root.
    pub fn upsert(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.target != entry.target);
        self.entries.insert(0, entry);
    }

    pub fn get(&self, root: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.target == root)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn entry(path: &[&str], summary: &str) -> HistoryEntry {
        let path = InvestigationPath::from_steps(path.iter().map(|s| s.to_string()).collect());
        let results = InvestigationResult {
            summary: summary.to_string(),
            ..Default::default()
        };
        HistoryEntry::new(path, results, Vec::new()).unwrap()
    }

    #[test]
    fn test_same_root_overwrites() {
        let mut history = History::default();
        history.upsert(entry(&["ivan"], "first"));
        history.upsert(entry(&["olena"], "other"));
        history.upsert(entry(&["ivan", "a@x.com"], "second"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].target, "ivan");
        assert_eq!(history.get("ivan").unwrap().results.summary, "second");
        assert_eq!(history.get("ivan").unwrap().investigation_path.len(), 2);
    }

    #[test]
    fn test_entry_is_keyed_by_root() {
        let e = entry(&["ivan", "a@x.com"], "s");
        assert_eq!(e.id, "ivan");
        assert_eq!(e.target, "ivan");
        assert!(e.saved_at().is_some());
        assert!(HistoryEntry::new(InvestigationPath::default(), Default::default(), vec![]).is_none());
    }

    #[tokio::test]
    async fn test_corrupt_slot_is_discarded_and_cleared() {
        let store = MemoryStore::with_raw("{definitely not a list");

        let history = History::load(&store).await;

        assert!(history.is_empty());
        assert!(store.raw().is_none());
    }

    #[tokio::test]
    async fn test_load_deduplicates_by_root() {
        let store = MemoryStore::new();
        store
            .save(&[entry(&["ivan"], "newest"), entry(&["ivan"], "stale")])
            .await
            .unwrap();

        let history = History::load(&store).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].results.summary, "newest");
    }
}
