use std::sync::Arc;
use thiserror::Error;

use crate::core::decode::DecodeError;
use crate::models::{Profile, ProfileUpdate};
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::store::{Document, DocumentStore, RangeQuery, StoreError};

/// Errors returned by the profile repository
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid profile update: {0}")]
    Invalid(String),
}

/// Global age limits every stored age and seeking bound must respect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBounds {
    pub min: u8,
    pub max: u8,
}

impl Default for AgeBounds {
    fn default() -> Self {
        Self { min: 18, max: 99 }
    }
}

impl AgeBounds {
    pub fn contains(&self, age: u8) -> bool {
        age >= self.min && age <= self.max
    }
}

/// Profile records in the document store
pub struct ProfileRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
    bounds: AgeBounds,
    cache: Option<Arc<CacheManager>>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, bounds: AgeBounds) -> Self {
        Self {
            store,
            collection: collection.into(),
            bounds,
            cache: None,
        }
    }

    /// Cache decoded profiles; updates through this repository invalidate them
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn bounds(&self) -> AgeBounds {
        self.bounds
    }

    pub async fn get(&self, id: &str) -> Result<Profile, ProfileError> {
        let key = CacheKey::profile(id);
        if let Some(cache) = &self.cache {
            if let Ok(profile) = cache.get::<Profile>(&key).await {
                return Ok(profile);
            }
        }

        let doc = self
            .store
            .get(&self.collection, id)
            .await?
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        let profile = Profile::decode(id, doc)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &profile).await {
                tracing::warn!("Failed to cache profile {}: {}", id, e);
            }
        }

        Ok(profile)
    }

    /// Profile for a freshly signed-in user: a missing record yields a
    /// default profile instead of an error
    pub async fn get_or_default(&self, id: &str) -> Result<Profile, ProfileError> {
        match self.get(id).await {
            Err(ProfileError::NotFound(_)) => {
                tracing::info!("No profile stored for {}, using defaults", id);
                Ok(Profile::with_defaults(id))
            }
            other => other,
        }
    }

    /// Store a new profile in full
    pub async fn create(&self, profile: &Profile) -> Result<(), ProfileError> {
        self.check_ages(profile.age, profile.min_seeking_age, profile.max_seeking_age)?;
        let doc = profile.to_document();
        self.store.patch(&self.collection, &profile.uid, doc).await?;
        self.invalidate(&profile.uid).await;

        tracing::info!("Created profile {}", profile.uid);
        Ok(())
    }

    /// Write only the fields set in `update` to the existing profile `id`.
    /// An unknown id is `NotFound`; nothing is created.
    pub async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<(), ProfileError> {
        if update.is_empty() {
            return Ok(());
        }

        if let Some(age) = update.age {
            self.check_age(age)?;
        }
        if let (Some(min), Some(max)) = (update.min_seeking_age, update.max_seeking_age) {
            self.check_seeking_range(min, max)?;
        }

        let current = self.get(id).await?;

        if update.touches_seeking_range() {
            // A single bound is checked against the stored counterpart
            self.check_seeking_range(
                update.min_seeking_age.unwrap_or(current.min_seeking_age),
                update.max_seeking_age.unwrap_or(current.max_seeking_age),
            )?;
        }

        self.store
            .patch(&self.collection, id, update.to_document())
            .await?;
        self.invalidate(id).await;

        tracing::debug!("Updated profile {}", id);
        Ok(())
    }

    /// Raw records whose age lies in `[min, max]`, filtered by the store
    pub async fn query_age_range(
        &self,
        min: u8,
        max: u8,
        limit: usize,
    ) -> Result<Vec<(String, Document)>, ProfileError> {
        let query = RangeQuery::new("age", i64::from(min), i64::from(max), limit);
        Ok(self.store.query_range(&self.collection, &query).await?)
    }

    fn check_ages(&self, age: u8, min: u8, max: u8) -> Result<(), ProfileError> {
        self.check_age(age)?;
        self.check_seeking_range(min, max)
    }

    fn check_age(&self, age: u8) -> Result<(), ProfileError> {
        if !self.bounds.contains(age) {
            return Err(ProfileError::Invalid(format!(
                "age {} outside {}..={}",
                age, self.bounds.min, self.bounds.max
            )));
        }
        Ok(())
    }

    fn check_seeking_range(&self, min: u8, max: u8) -> Result<(), ProfileError> {
        if !self.bounds.contains(min) || !self.bounds.contains(max) {
            return Err(ProfileError::Invalid(format!(
                "seeking range {}..={} outside {}..={}",
                min, max, self.bounds.min, self.bounds.max
            )));
        }
        if min > max {
            return Err(ProfileError::Invalid(format!(
                "minimum seeking age {} above maximum {}",
                min, max
            )));
        }
        Ok(())
    }

    async fn invalidate(&self, id: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(&CacheKey::profile(id)).await {
                tracing::warn!("Failed to invalidate cached profile {}: {}", id, e);
            }
        }
    }
}
