//! Typed decoding of stored profile records.
//!
//! All defaulting of missing fields happens here and nowhere else, so a
//! record missing optional data still yields a usable profile. A field of
//! the wrong type, or a record claiming another user's id, is reported as
//! a [`DecodeError`] instead.
//!
//! Photos are stored as two parallel string arrays, `photoUrls` and
//! `photoKeys`, with an empty key marking a photo whose storage key is
//! unknown.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    MatchEntry, Photo, Profile, ProfileUpdate, DEFAULT_MAX_SEEKING_AGE, DEFAULT_MIN_SEEKING_AGE,
    REGISTRATION_AGE,
};
use crate::services::store::Document;

/// Unrecoverable record shape
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Record {id} has an invalid shape: {source}")]
    Shape {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {id} claims uid {claimed}")]
    IdMismatch { id: String, claimed: String },
}

/// Stored shape of a profile; every field may be absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredProfile {
    uid: Option<String>,
    fullname: Option<String>,
    email: Option<String>,
    age: Option<u8>,
    photo_urls: Option<Vec<String>>,
    photo_keys: Option<Vec<String>>,
    /// Written by early app versions: URLs only, no storage keys
    #[serde(rename = "imageURLs")]
    image_urls: Option<Vec<String>>,
    bio: Option<String>,
    profession: Option<String>,
    min_seeking_age: Option<u8>,
    max_seeking_age: Option<u8>,
    created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Decode the stored document `doc` with id `id`
    pub fn decode(id: &str, doc: Document) -> Result<Profile, DecodeError> {
        let stored: StoredProfile =
            serde_json::from_value(Value::Object(doc)).map_err(|source| DecodeError::Shape {
                id: id.to_string(),
                source,
            })?;

        if let Some(claimed) = stored.uid.as_deref() {
            if claimed != id {
                return Err(DecodeError::IdMismatch {
                    id: id.to_string(),
                    claimed: claimed.to_string(),
                });
            }
        }

        let photos = match (stored.photo_urls, stored.image_urls) {
            (Some(urls), _) => zip_photos(urls, stored.photo_keys.unwrap_or_default()),
            (None, Some(urls)) => urls.into_iter().map(Photo::legacy).collect(),
            (None, None) => Vec::new(),
        };

        Ok(Profile {
            uid: id.to_string(),
            fullname: stored.fullname.unwrap_or_default(),
            email: stored.email.unwrap_or_default(),
            age: stored.age.unwrap_or(REGISTRATION_AGE),
            photos,
            bio: stored.bio.unwrap_or_default(),
            profession: stored.profession.unwrap_or_default(),
            min_seeking_age: stored.min_seeking_age.unwrap_or(DEFAULT_MIN_SEEKING_AGE),
            max_seeking_age: stored.max_seeking_age.unwrap_or(DEFAULT_MAX_SEEKING_AGE),
            created_at: stored.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    }

    /// Full document for a newly created profile
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("uid".into(), Value::from(self.uid.as_str()));
        doc.insert("fullname".into(), Value::from(self.fullname.as_str()));
        doc.insert("email".into(), Value::from(self.email.as_str()));
        doc.insert("age".into(), Value::from(self.age));
        insert_photos(&mut doc, &self.photos);
        doc.insert("bio".into(), Value::from(self.bio.as_str()));
        doc.insert("profession".into(), Value::from(self.profession.as_str()));
        doc.insert("minSeekingAge".into(), Value::from(self.min_seeking_age));
        doc.insert("maxSeekingAge".into(), Value::from(self.max_seeking_age));
        doc.insert("createdAt".into(), Value::from(self.created_at.to_rfc3339()));
        doc
    }
}

/// Pair stored URLs with stored keys; a short or empty key list yields
/// keyless photos
fn zip_photos(urls: Vec<String>, keys: Vec<String>) -> Vec<Photo> {
    let mut keys = keys.into_iter();
    urls.into_iter()
        .map(|url| match keys.next().filter(|k| !k.is_empty()) {
            Some(key) => Photo::new(url, key),
            None => Photo::legacy(url),
        })
        .collect()
}

fn insert_photos(doc: &mut Document, photos: &[Photo]) {
    let urls = photos.iter().map(|p| Value::from(p.url.as_str())).collect();
    let keys = photos
        .iter()
        .map(|p| Value::from(p.key.as_deref().unwrap_or("")))
        .collect();
    doc.insert("photoUrls".into(), Value::Array(urls));
    doc.insert("photoKeys".into(), Value::Array(keys));
}

impl ProfileUpdate {
    /// Only the fields this update sets, under their stored names
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(fullname) = &self.fullname {
            doc.insert("fullname".into(), Value::from(fullname.as_str()));
        }
        if let Some(age) = self.age {
            doc.insert("age".into(), Value::from(age));
        }
        if let Some(bio) = &self.bio {
            doc.insert("bio".into(), Value::from(bio.as_str()));
        }
        if let Some(profession) = &self.profession {
            doc.insert("profession".into(), Value::from(profession.as_str()));
        }
        if let Some(min) = self.min_seeking_age {
            doc.insert("minSeekingAge".into(), Value::from(min));
        }
        if let Some(max) = self.max_seeking_age {
            doc.insert("maxSeekingAge".into(), Value::from(max));
        }
        if let Some(photos) = &self.photos {
            insert_photos(&mut doc, photos);
        }
        doc
    }
}

/// Stored shape of a match document: one per (owner, other) pair
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMatch {
    owner_id: String,
    uid: String,
    fullname: String,
    profile_image_url: String,
}

impl MatchEntry {
    /// Decode match document `id`, which must belong to `owner_id`
    pub fn decode(id: &str, owner_id: &str, doc: Document) -> Result<MatchEntry, DecodeError> {
        let stored: StoredMatch =
            serde_json::from_value(Value::Object(doc)).map_err(|source| DecodeError::Shape {
                id: id.to_string(),
                source,
            })?;

        if stored.owner_id != owner_id {
            return Err(DecodeError::IdMismatch {
                id: id.to_string(),
                claimed: stored.owner_id,
            });
        }
        Ok(MatchEntry {
            uid: stored.uid,
            fullname: stored.fullname,
            profile_image_url: stored.profile_image_url,
        })
    }

    /// Match document placing this entry in `owner_id`'s list
    pub fn to_document(&self, owner_id: &str) -> Document {
        let mut doc = Document::new();
        doc.insert("ownerId".into(), Value::from(owner_id));
        doc.insert("uid".into(), Value::from(self.uid.as_str()));
        doc.insert("fullname".into(), Value::from(self.fullname.as_str()));
        doc.insert("profileImageUrl".into(), Value::from(self.profile_image_url.as_str()));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_record_gets_defaults() {
        let profile = Profile::decode("u1", Document::new()).unwrap();
        assert_eq!(profile, Profile::with_defaults("u1"));
    }

    #[test]
    fn test_missing_bounds_default_to_18_40() {
        let profile = Profile::decode("u1", doc(json!({"fullname": "Jane", "age": 30}))).unwrap();
        assert_eq!(profile.min_seeking_age, 18);
        assert_eq!(profile.max_seeking_age, 40);
        assert_eq!(profile.bio, "");
        assert_eq!(profile.age, 30);
    }

    #[test]
    fn test_null_fields_are_defaulted() {
        let profile = Profile::decode("u1", doc(json!({"bio": null, "profession": null}))).unwrap();
        assert_eq!(profile.bio, "");
        assert_eq!(profile.profession, "");
    }

    #[test]
    fn test_legacy_image_urls() {
        let profile = Profile::decode(
            "u1",
            doc(json!({"imageURLs": ["https://a.test/1.jpeg", "https://a.test/2.jpeg"]})),
        )
        .unwrap();

        assert_eq!(profile.photos.len(), 2);
        assert_eq!(profile.photos[0], Photo::legacy("https://a.test/1.jpeg"));
    }

    #[test]
    fn test_photos_take_precedence_over_legacy_urls() {
        let profile = Profile::decode(
            "u1",
            doc(json!({
                "photoUrls": ["https://a.test/new.jpeg"],
                "photoKeys": ["new"],
                "imageURLs": ["https://a.test/old.jpeg"],
            })),
        )
        .unwrap();

        assert_eq!(profile.photos, vec![Photo::new("https://a.test/new.jpeg", "new")]);
    }

    #[test]
    fn test_empty_or_missing_keys_are_keyless() {
        let profile = Profile::decode(
            "u1",
            doc(json!({
                "photoUrls": ["https://a.test/1.jpeg", "https://a.test/2.jpeg", "https://a.test/3.jpeg"],
                "photoKeys": ["k1", ""],
            })),
        )
        .unwrap();

        assert_eq!(
            profile.photos,
            vec![
                Photo::new("https://a.test/1.jpeg", "k1"),
                Photo::legacy("https://a.test/2.jpeg"),
                Photo::legacy("https://a.test/3.jpeg"),
            ]
        );
    }

    #[test]
    fn test_document_uses_scalar_photo_arrays() {
        let mut profile = Profile::with_defaults("u1");
        profile.photos = vec![
            Photo::new("https://a.test/1.jpeg", "k1"),
            Photo::legacy("https://a.test/2.jpeg"),
        ];

        let doc = profile.to_document();
        assert_eq!(doc["photoUrls"], json!(["https://a.test/1.jpeg", "https://a.test/2.jpeg"]));
        assert_eq!(doc["photoKeys"], json!(["k1", ""]));
        assert!(!doc.contains_key("photos"));
        assert!(doc.values().all(|v| !v.is_object()));
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let err = Profile::decode("u1", doc(json!({"age": "thirty"}))).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { .. }));
    }

    #[test]
    fn test_id_mismatch_is_an_error() {
        let err = Profile::decode("u1", doc(json!({"uid": "u2"}))).unwrap_err();
        assert!(matches!(err, DecodeError::IdMismatch { .. }));
    }

    #[test]
    fn test_document_roundtrip() {
        let mut profile = Profile::with_defaults("u1");
        profile.fullname = "Jane".to_string();
        profile.photos = vec![Photo::new("https://a.test/1.jpeg", "k1")];
        profile.created_at = Utc::now();

        let decoded = Profile::decode("u1", profile.to_document()).unwrap();
        assert_eq!(decoded, profile);
    }

    #[test]
    fn test_update_document_only_has_set_fields() {
        let update = ProfileUpdate {
            bio: Some("hello".to_string()),
            max_seeking_age: Some(30),
            ..Default::default()
        };

        let doc = update.to_document();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["bio"], "hello");
        assert_eq!(doc["maxSeekingAge"], 30);
    }

    #[test]
    fn test_update_photos_written_as_arrays() {
        let update = ProfileUpdate {
            photos: Some(vec![Photo::new("https://a.test/1.jpeg", "k1")]),
            ..Default::default()
        };

        let doc = update.to_document();
        assert_eq!(doc["photoUrls"], json!(["https://a.test/1.jpeg"]));
        assert_eq!(doc["photoKeys"], json!(["k1"]));
    }

    #[test]
    fn test_match_entry_decode() {
        let stored = doc(json!({
            "ownerId": "a",
            "uid": "c1",
            "fullname": "Jane",
            "profileImageUrl": "https://a.test/1"
        }));
        let entry = MatchEntry::decode("m1", "a", stored.clone()).unwrap();
        assert_eq!(entry.uid, "c1");
        assert_eq!(entry.to_document("a"), stored);

        assert!(matches!(
            MatchEntry::decode("m1", "b", stored),
            Err(DecodeError::IdMismatch { .. })
        ));
        assert!(MatchEntry::decode("m1", "a", doc(json!({"ownerId": "a"}))).is_err());
    }
}
