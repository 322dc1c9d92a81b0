use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::models::SwipeMap;
use crate::services::store::{pair_document_id, Document, DocumentStore, StoreError};

/// Upper bound on the swipes read back for one actor
const MAX_SWIPES_PER_ACTOR: usize = 5000;

/// Per-actor swipe decisions.
///
/// A swipe is always a single-record create-or-update: the record is
/// created on the first swipe, and swiping the same candidate again
/// overwrites the earlier decision.
#[async_trait]
pub trait SwipeStore: Send + Sync {
    async fn record_swipe(&self, actor_id: &str, candidate_id: &str, liked: bool) -> Result<(), StoreError>;

    /// All decisions of `actor_id`; empty when the actor never swiped
    async fn swipe_map(&self, actor_id: &str) -> Result<SwipeMap, StoreError>;

    /// The decision of `actor_id` about `candidate_id`, if any
    async fn decision(&self, actor_id: &str, candidate_id: &str) -> Result<Option<bool>, StoreError>;
}

/// Swipe store kept in the document store: one fixed-shape document
/// `{actorId, candidateId, liked}` per (actor, candidate) pair, under a
/// deterministic id so a repeated swipe overwrites in place.
pub struct DocumentSwipeStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl DocumentSwipeStore {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl SwipeStore for DocumentSwipeStore {
    async fn record_swipe(&self, actor_id: &str, candidate_id: &str, liked: bool) -> Result<(), StoreError> {
        let mut fields = Document::new();
        fields.insert("actorId".into(), Value::from(actor_id));
        fields.insert("candidateId".into(), Value::from(candidate_id));
        fields.insert("liked".into(), Value::Bool(liked));

        let id = pair_document_id(actor_id, candidate_id);
        self.store.patch(&self.collection, &id, fields).await?;

        tracing::debug!("Recorded swipe: {} -> {} (liked: {})", actor_id, candidate_id, liked);
        Ok(())
    }

    async fn swipe_map(&self, actor_id: &str) -> Result<SwipeMap, StoreError> {
        let docs = self
            .store
            .query_equal(&self.collection, "actorId", actor_id, MAX_SWIPES_PER_ACTOR)
            .await?;

        let map: SwipeMap = docs
            .into_iter()
            .filter_map(|(id, doc)| {
                let candidate = doc.get("candidateId").and_then(Value::as_str);
                let liked = doc.get("liked").and_then(Value::as_bool);
                match (candidate, liked) {
                    (Some(candidate), Some(liked)) => Some((candidate.to_string(), liked)),
                    _ => {
                        tracing::warn!("Ignoring malformed swipe {} of {}", id, actor_id);
                        None
                    }
                }
            })
            .collect();

        tracing::debug!("User {} has swiped {} profiles", actor_id, map.len());
        Ok(map)
    }

    async fn decision(&self, actor_id: &str, candidate_id: &str) -> Result<Option<bool>, StoreError> {
        let id = pair_document_id(actor_id, candidate_id);
        let doc = self.store.get(&self.collection, &id).await?;
        Ok(doc.and_then(|d| d.get("liked").and_then(Value::as_bool)))
    }
}
