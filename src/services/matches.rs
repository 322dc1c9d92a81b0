use std::sync::Arc;

use crate::models::MatchEntry;
use crate::services::store::{pair_document_id, DocumentStore, StoreError};

/// Upper bound on the entries read back for one owner
const MAX_MATCHES_PER_OWNER: usize = 5000;

/// Per-user match lists.
///
/// One fixed-shape document per (owner, other) pair, so writing an entry
/// never touches the rest of the list and the two sides of a match are
/// independent writes.
pub struct MatchStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl MatchStore {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Store `entry` in `owner_id`'s match list, keyed by `entry.uid`
    pub async fn put(&self, owner_id: &str, entry: &MatchEntry) -> Result<(), StoreError> {
        let id = pair_document_id(owner_id, &entry.uid);
        self.store
            .patch(&self.collection, &id, entry.to_document(owner_id))
            .await?;

        tracing::debug!("Stored match entry {} -> {}", owner_id, entry.uid);
        Ok(())
    }

    /// All entries of `owner_id`'s match list, sorted by name.
    /// Malformed entries are skipped.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<MatchEntry>, StoreError> {
        let docs = self
            .store
            .query_equal(&self.collection, "ownerId", owner_id, MAX_MATCHES_PER_OWNER)
            .await?;

        let mut entries: Vec<MatchEntry> = docs
            .into_iter()
            .filter_map(|(id, doc)| match MatchEntry::decode(&id, owner_id, doc) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping match entry of {}: {}", owner_id, e);
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| a.fullname.cmp(&b.fullname).then_with(|| a.uid.cmp(&b.uid)));

        Ok(entries)
    }

    pub async fn contains(&self, owner_id: &str, other_id: &str) -> Result<bool, StoreError> {
        let id = pair_document_id(owner_id, other_id);
        Ok(self.store.get(&self.collection, &id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::InMemoryDocumentStore;
    use serde_json::json;

    fn entry(uid: &str, name: &str) -> MatchEntry {
        MatchEntry {
            uid: uid.to_string(),
            fullname: name.to_string(),
            profile_image_url: format!("https://cdn.test/{}.jpeg", uid),
        }
    }

    #[tokio::test]
    async fn test_entries_accumulate_per_owner() {
        let matches = MatchStore::new(Arc::new(InMemoryDocumentStore::new()), "matches");
        matches.put("a", &entry("c2", "Zoe")).await.unwrap();
        matches.put("a", &entry("c1", "Ann")).await.unwrap();

        let list = matches.list("a").await.unwrap();
        assert_eq!(list, vec![entry("c1", "Ann"), entry("c2", "Zoe")]);
        assert!(matches.contains("a", "c1").await.unwrap());
        assert!(!matches.contains("c1", "a").await.unwrap());
        assert!(matches.list("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entry_skipped() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .patch(
                "matches",
                "broken",
                json!({"ownerId": "a", "uid": 42}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        let matches = MatchStore::new(store, "matches");
        matches.put("a", &entry("c1", "Ann")).await.unwrap();

        assert_eq!(matches.list("a").await.unwrap(), vec![entry("c1", "Ann")]);
    }

    #[tokio::test]
    async fn test_repeated_put_overwrites_single_document() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let matches = MatchStore::new(store.clone(), "matches");
        matches.put("a", &entry("c1", "Ann")).await.unwrap();
        matches.put("a", &entry("c1", "Annie")).await.unwrap();

        assert_eq!(store.list("matches", 10).await.unwrap().len(), 1);
        assert_eq!(matches.list("a").await.unwrap()[0].fullname, "Annie");

        let doc = store
            .get("matches", &pair_document_id("a", "c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["ownerId"], "a");
        assert_eq!(doc["profileImageUrl"], "https://cdn.test/c1.jpeg");
    }
}
