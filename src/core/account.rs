use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Photo, Profile, ProfileUpdate};
use crate::services::media::{delete_best_effort, MediaError, MediaStore};
use crate::services::profiles::{ProfileError, ProfileRepository};

/// Folder profile photos are uploaded under
const PROFILE_FOLDER: &str = "profile";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("A profile holds at most {max} photos")]
    PhotoLimit { max: usize },
}

/// Registration and photo management
pub struct AccountService {
    profiles: Arc<ProfileRepository>,
    media: Arc<dyn MediaStore>,
    max_photos: usize,
}

impl AccountService {
    pub fn new(profiles: Arc<ProfileRepository>, media: Arc<dyn MediaStore>, max_photos: usize) -> Self {
        Self {
            profiles,
            media,
            max_photos: max_photos.max(1),
        }
    }

    /// Create the profile of a newly signed-up user with `image` as its
    /// only photo.
    ///
    /// The photo is uploaded first. If the profile write then fails, the
    /// blob is removed again so no orphan is left behind.
    pub async fn register(
        &self,
        uid: &str,
        email: &str,
        fullname: &str,
        image: Vec<u8>,
    ) -> Result<Profile, AccountError> {
        let photo: Photo = self.media.upload(image, PROFILE_FOLDER).await?.into();

        let mut profile = Profile::with_defaults(uid);
        profile.email = email.to_string();
        profile.fullname = fullname.to_string();
        profile.photos = vec![photo];
        profile.created_at = Utc::now();

        if let Err(e) = self.profiles.create(&profile).await {
            tracing::error!("Registration of {} failed: {}", uid, e);
            for photo in &profile.photos {
                delete_best_effort(self.media.as_ref(), photo).await;
            }
            return Err(e.into());
        }

        tracing::info!("Registered {}", uid);
        Ok(profile)
    }

    /// Upload `image` into slot `index` of `uid`'s photos.
    ///
    /// An existing slot is replaced and its old blob deleted once the new
    /// list is stored; any other index appends. Returns the stored list.
    pub async fn set_photo(
        &self,
        uid: &str,
        index: usize,
        image: Vec<u8>,
    ) -> Result<Vec<Photo>, AccountError> {
        let mut photos = self.profiles.get(uid).await?.photos;

        let replaces = index < photos.len();
        if !replaces && photos.len() >= self.max_photos {
            return Err(AccountError::PhotoLimit {
                max: self.max_photos,
            });
        }

        let photo: Photo = self.media.upload(image, PROFILE_FOLDER).await?.into();

        let previous = if replaces {
            Some(std::mem::replace(&mut photos[index], photo.clone()))
        } else {
            photos.push(photo.clone());
            None
        };

        let update = ProfileUpdate {
            photos: Some(photos.clone()),
            ..Default::default()
        };
        if let Err(e) = self.profiles.update(uid, &update).await {
            delete_best_effort(self.media.as_ref(), &photo).await;
            return Err(e.into());
        }

        if let Some(old) = previous {
            delete_best_effort(self.media.as_ref(), &old).await;
        }

        Ok(photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media::InMemoryMediaStore;
    use crate::services::profiles::AgeBounds;
    use crate::services::store::InMemoryDocumentStore;

    fn service(max_photos: usize) -> (AccountService, Arc<InMemoryMediaStore>, Arc<ProfileRepository>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let profiles = Arc::new(ProfileRepository::new(store, "profiles", AgeBounds::default()));
        let media = Arc::new(InMemoryMediaStore::new("https://blobs.test"));
        (
            AccountService::new(profiles.clone(), media.clone(), max_photos),
            media,
            profiles,
        )
    }

    #[tokio::test]
    async fn test_register_stores_defaults_and_photo() {
        let (accounts, media, profiles) = service(3);
        let profile = accounts
            .register("u1", "jane@example.com", "Jane", vec![1, 2, 3])
            .await
            .unwrap();

        let stored = profiles.get("u1").await.unwrap();
        assert_eq!(stored.age, 18);
        assert_eq!(stored.min_seeking_age, 18);
        assert_eq!(stored.max_seeking_age, 40);
        assert_eq!(stored.photos, profile.photos);
        assert_eq!(media.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_without_image_fails() {
        let (accounts, _, profiles) = service(3);
        assert!(matches!(
            accounts.register("u1", "jane@example.com", "Jane", Vec::new()).await,
            Err(AccountError::Media(MediaError::EmptyPayload))
        ));
        assert!(profiles.get("u1").await.is_err());
    }

    #[tokio::test]
    async fn test_replace_deletes_old_blob() {
        let (accounts, media, _) = service(3);
        let profile = accounts.register("u1", "a@b.co", "Jane", vec![1]).await.unwrap();
        let old_key = profile.photos[0].key.clone().unwrap();

        let photos = accounts.set_photo("u1", 0, vec![2]).await.unwrap();

        assert_eq!(photos.len(), 1);
        assert_ne!(photos[0], profile.photos[0]);
        assert!(!media.contains(&old_key).await);
        assert_eq!(media.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_respects_limit() {
        let (accounts, media, _) = service(2);
        accounts.register("u1", "a@b.co", "Jane", vec![1]).await.unwrap();

        let photos = accounts.set_photo("u1", 5, vec![2]).await.unwrap();
        assert_eq!(photos.len(), 2);

        assert!(matches!(
            accounts.set_photo("u1", 5, vec![3]).await,
            Err(AccountError::PhotoLimit { max: 2 })
        ));
        assert_eq!(media.len().await, 2);
    }
}
