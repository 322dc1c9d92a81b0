use std::iter::FusedIterator;
use std::sync::Arc;
use thiserror::Error;

use crate::core::filters::{is_browsable, seeking_window};
use crate::models::{Profile, SwipeMap};
use crate::services::profiles::{ProfileError, ProfileRepository};
use crate::services::store::{Document, StoreError};
use crate::services::swipes::SwipeStore;

/// Errors that can occur while building a batch
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to load swipes: {0}")]
    Swipes(#[from] StoreError),

    #[error("Failed to query candidates: {0}")]
    Profiles(#[from] ProfileError),
}

/// Produces batches of browsable candidates for an actor
pub struct CandidateFeed {
    profiles: Arc<ProfileRepository>,
    swipes: Arc<dyn SwipeStore>,
    page_size: usize,
}

impl CandidateFeed {
    pub fn new(profiles: Arc<ProfileRepository>, swipes: Arc<dyn SwipeStore>, page_size: usize) -> Self {
        Self {
            profiles,
            swipes,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Next batch for `actor` with the default page size
    pub async fn next_batch(&self, actor: &Profile) -> Result<CandidateBatch, FeedError> {
        self.next_batch_with_limit(actor, self.page_size).await
    }

    /// Next batch of at most `limit` candidates.
    ///
    /// The age range is filtered by the store; self and already swiped ids
    /// are dropped while the batch is consumed. The store is asked for
    /// enough extra records to cover those exclusions, but a batch is never
    /// guaranteed to exhaust the age range.
    pub async fn next_batch_with_limit(
        &self,
        actor: &Profile,
        limit: usize,
    ) -> Result<CandidateBatch, FeedError> {
        let Some((min, max)) = seeking_window(actor, self.profiles.bounds()) else {
            tracing::warn!(
                "User {} has an unusable seeking range {}..={}, returning empty feed",
                actor.uid,
                actor.min_seeking_age,
                actor.max_seeking_age
            );
            return Ok(CandidateBatch::empty(actor));
        };

        let swiped = self.swipes.swipe_map(&actor.uid).await?;

        let fetch = limit.saturating_add(swiped.len()).saturating_add(1);
        let records = self.profiles.query_age_range(min, max, fetch).await?;

        tracing::debug!(
            "Fetched {} records aged {}..={} for {} (excluding {} swiped)",
            records.len(),
            min,
            max,
            actor.uid,
            swiped.len()
        );

        Ok(CandidateBatch {
            actor: actor.clone(),
            swiped,
            records: records.into_iter(),
            remaining: limit,
        })
    }
}

/// A finite, single-pass sequence of candidates.
///
/// Records are decoded lazily; malformed ones are logged and skipped so a
/// single bad record never empties the batch.
pub struct CandidateBatch {
    actor: Profile,
    swiped: SwipeMap,
    records: std::vec::IntoIter<(String, Document)>,
    remaining: usize,
}

impl CandidateBatch {
    fn empty(actor: &Profile) -> Self {
        Self {
            actor: actor.clone(),
            swiped: SwipeMap::new(),
            records: Vec::new().into_iter(),
            remaining: 0,
        }
    }
}

impl Iterator for CandidateBatch {
    type Item = Profile;

    fn next(&mut self) -> Option<Profile> {
        if self.remaining == 0 {
            return None;
        }

        for (id, doc) in self.records.by_ref() {
            // Cheap exclusions before paying for a decode
            if id == self.actor.uid || self.swiped.contains_key(&id) {
                continue;
            }

            let candidate = match Profile::decode(&id, doc) {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::warn!("Skipping malformed candidate: {}", e);
                    continue;
                }
            };

            if is_browsable(&candidate, &self.actor, &self.swiped) {
                self.remaining -= 1;
                return Some(candidate);
            }
        }

        self.remaining = 0;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining.min(self.records.len())))
    }
}

impl FusedIterator for CandidateBatch {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profiles::AgeBounds;
    use crate::services::store::{DocumentStore, InMemoryDocumentStore};
    use crate::services::swipes::DocumentSwipeStore;
    use serde_json::json;

    async fn feed_with(ages: &[(&str, u8)], page_size: usize) -> (CandidateFeed, Arc<DocumentSwipeStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        for (id, age) in ages {
            store
                .patch(
                    "profiles",
                    id,
                    json!({ "fullname": id, "age": age }).as_object().cloned().unwrap(),
                )
                .await
                .unwrap();
        }
        let profiles = Arc::new(ProfileRepository::new(store.clone(), "profiles", AgeBounds::default()));
        let swipes = Arc::new(DocumentSwipeStore::new(store, "swipes"));
        (CandidateFeed::new(profiles, swipes.clone(), page_size), swipes)
    }

    fn actor(uid: &str, min: u8, max: u8) -> Profile {
        let mut profile = Profile::with_defaults(uid);
        profile.age = 22;
        profile.min_seeking_age = min;
        profile.max_seeking_age = max;
        profile
    }

    #[tokio::test]
    async fn test_page_size_caps_batch() {
        let ages: Vec<(String, u8)> = (0..10).map(|i| (format!("c{}", i), 30)).collect();
        let refs: Vec<(&str, u8)> = ages.iter().map(|(id, age)| (id.as_str(), *age)).collect();
        let (feed, _) = feed_with(&refs, 3).await;

        let batch: Vec<Profile> = feed.next_batch(&actor("me", 18, 40)).await.unwrap().collect();
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn test_swiped_candidates_do_not_starve_the_page() {
        let (feed, swipes) = feed_with(&[("a", 30), ("b", 30), ("c", 30), ("d", 30)], 2).await;
        swipes.record_swipe("me", "a", true).await.unwrap();
        swipes.record_swipe("me", "b", false).await.unwrap();

        let ids: Vec<String> = feed
            .next_batch(&actor("me", 18, 40))
            .await
            .unwrap()
            .map(|p| p.uid)
            .collect();
        assert_eq!(ids, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_malformed_record_skipped() {
        let store = Arc::new(InMemoryDocumentStore::new());
        for (id, doc) in [
            ("bad", json!({"age": 30, "fullname": 7})),
            ("good", json!({"age": 30, "fullname": "Good"})),
        ] {
            store
                .patch("profiles", id, doc.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        let profiles = Arc::new(ProfileRepository::new(store.clone(), "profiles", AgeBounds::default()));
        let feed = CandidateFeed::new(profiles, Arc::new(DocumentSwipeStore::new(store, "swipes")), 10);

        let ids: Vec<String> = feed
            .next_batch(&actor("me", 18, 40))
            .await
            .unwrap()
            .map(|p| p.uid)
            .collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[tokio::test]
    async fn test_degenerate_range_yields_empty_batch() {
        let (feed, _) = feed_with(&[("a", 30)], 10).await;
        let mut batch = feed.next_batch(&actor("me", 40, 20)).await.unwrap();
        assert!(batch.next().is_none());
    }

    #[tokio::test]
    async fn test_batch_is_single_pass() {
        let (feed, _) = feed_with(&[("a", 30)], 10).await;
        let mut batch = feed.next_batch(&actor("me", 18, 40)).await.unwrap();
        assert!(batch.next().is_some());
        assert!(batch.next().is_none());
        assert!(batch.next().is_none());
    }
}
