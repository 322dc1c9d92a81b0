// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    MatchEntry, MatchOutcome, Photo, Profile, ProfileUpdate, ReconcileReport, SwipeMap,
    DEFAULT_MAX_SEEKING_AGE, DEFAULT_MIN_SEEKING_AGE, REGISTRATION_AGE,
};
pub use requests::{FeedQuery, RegisterQuery, SwipeRequest, UpdateProfileRequest};
pub use responses::{ErrorResponse, FeedResponse, HealthResponse, MatchListResponse, SwipeResponse};
