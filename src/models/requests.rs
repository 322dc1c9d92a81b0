use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::ProfileUpdate;

/// Query string of the registration endpoint; the body carries the photo
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterQuery {
    #[validate(length(min = 1, max = 80))]
    pub fullname: String,
    #[validate(email)]
    pub email: String,
}

/// Request to record a swipe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: String,
    pub liked: bool,
}

/// Feed paging parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u16>,
}

/// Partial profile edit. Absent fields are left untouched.
///
/// Only per-field bounds are checked here; the seeking range is checked
/// against the stored profile by the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 80))]
    pub fullname: Option<String>,
    pub age: Option<u8>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(max = 80))]
    pub profession: Option<String>,
    pub min_seeking_age: Option<u8>,
    pub max_seeking_age: Option<u8>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            fullname: req.fullname,
            age: req.age,
            bio: req.bio,
            profession: req.profession,
            min_seeking_age: req.min_seeking_age,
            max_seeking_age: req.max_seeking_age,
            photos: None,
        }
    }
}
