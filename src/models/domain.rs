use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower bound of the seeking range given to new and legacy profiles
pub const DEFAULT_MIN_SEEKING_AGE: u8 = 18;
/// Upper bound of the seeking range given to new and legacy profiles
pub const DEFAULT_MAX_SEEKING_AGE: u8 = 40;
/// Age stored at registration until the user edits it
pub const REGISTRATION_AGE: u8 = 18;

/// A single profile photo.
///
/// `key` is the blob store's own storage key, recorded at upload time so
/// deletion never has to reverse-engineer it from the public URL. Records
/// written before keys were tracked carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Photo {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: Some(key.into()),
        }
    }

    /// Photo from a legacy record that only stored the URL
    pub fn legacy(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: None,
        }
    }
}

/// Public dating profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: String,
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    pub age: u8,
    /// Ordered, the first photo is the primary one
    pub photos: Vec<Photo>,
    pub bio: String,
    pub profession: String,
    pub min_seeking_age: u8,
    pub max_seeking_age: u8,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Profile with every optional field at its default
    pub fn with_defaults(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            fullname: String::new(),
            email: String::new(),
            age: REGISTRATION_AGE,
            photos: Vec::new(),
            bio: String::new(),
            profession: String::new(),
            min_seeking_age: DEFAULT_MIN_SEEKING_AGE,
            max_seeking_age: DEFAULT_MAX_SEEKING_AGE,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn primary_photo(&self) -> Option<&Photo> {
        self.photos.first()
    }

    /// Whether `age` falls inside this profile's inclusive seeking range
    pub fn seeks_age(&self, age: u8) -> bool {
        age >= self.min_seeking_age && age <= self.max_seeking_age
    }

    /// A seeking range with `min > max` can only come from a data bug
    pub fn has_degenerate_seeking_range(&self) -> bool {
        self.min_seeking_age > self.max_seeking_age
    }
}

/// Partial profile edit. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub age: Option<u8>,
    pub bio: Option<String>,
    pub profession: Option<String>,
    pub min_seeking_age: Option<u8>,
    pub max_seeking_age: Option<u8>,
    pub photos: Option<Vec<Photo>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn touches_seeking_range(&self) -> bool {
        self.min_seeking_age.is_some() || self.max_seeking_age.is_some()
    }
}

/// Swipe decisions of one actor, keyed by candidate id (`true` = like)
pub type SwipeMap = HashMap<String, bool>;

/// Denormalized projection of the other party of a match, stored under
/// the owner's match list and keyed by `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub uid: String,
    pub fullname: String,
    pub profile_image_url: String,
}

impl MatchEntry {
    /// Project `profile` for the other party's match list.
    ///
    /// Returns `None` when the profile has no photo to show.
    pub fn from_profile(profile: &Profile) -> Option<Self> {
        profile.primary_photo().map(|photo| Self {
            uid: profile.uid.clone(),
            fullname: profile.fullname.clone(),
            profile_image_url: photo.url.clone(),
        })
    }

    /// Banner shown on the match celebration screen
    pub fn celebration_text(&self) -> String {
        celebration_text(&self.fullname)
    }
}

/// Banner celebrating a match with the user named `name`
pub fn celebration_text(name: &str) -> String {
    format!("You and {} have liked each other!", capitalize_words(name))
}

fn capitalize_words(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Result of processing one swipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MatchOutcome {
    /// Dislike, or a like the candidate has not reciprocated (yet)
    NoMatch,
    /// Reciprocal like; both match entries were written.
    /// `entry` is the one stored under the actor, pointing at the candidate.
    Matched { entry: MatchEntry },
    /// Reciprocal like, but at least one side has no photo. The entry
    /// pointing at a profile without a photo is not written; `written` and
    /// `missing` list owner ids as for `PartiallyMatched`.
    #[serde(rename_all = "camelCase")]
    MatchedWithoutAvatar {
        without_photo: Vec<String>,
        written: Vec<String>,
        missing: Vec<String>,
    },
    /// Reciprocal like where some entry writes failed. Owner ids on each
    /// side; the missing ones can be repaired by reconciliation.
    PartiallyMatched {
        written: Vec<String>,
        missing: Vec<String>,
    },
}

impl MatchOutcome {
    /// Whether reciprocity was confirmed, regardless of what got written
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }
}

/// Summary of a reconciliation pass for one actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Liked candidates whose reciprocity was checked
    pub checked: usize,
    /// `(owner, other)` entries that were missing and have been written
    pub repaired: Vec<(String, String)>,
    /// `(owner, other)` entries that are still missing
    pub unresolved: Vec<(String, String)>,
}
