use serde::{Deserialize, Serialize};
use crate::models::domain::{MatchEntry, MatchOutcome, Profile};

/// Response for the feed endpoint
#[derive(Debug, Clone, Serialize)]
pub struct FeedResponse {
    pub candidates: Vec<Profile>,
    pub count: usize,
}

/// Response for the swipe endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResponse {
    pub outcome: MatchOutcome,
    /// Set when both entries were written and the client should celebrate
    pub celebration: Option<String>,
}

/// Response for the match list endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchEntry>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
