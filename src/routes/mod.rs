// Route exports
pub mod profiles;
pub mod swipes;

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder, ResponseError};
use std::sync::Arc;
use thiserror::Error;

use crate::config::FeedSettings;
use crate::core::{AccountError, AccountService, CandidateFeed, EngineError, FeedError, MatchEngine};
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::identity::bearer_token;
use crate::services::{IdentityProvider, MediaError, PostgresSwipeStore, ProfileError, ProfileRepository, StoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileRepository>,
    pub feed: Arc<CandidateFeed>,
    pub engine: Arc<MatchEngine>,
    pub accounts: Arc<AccountService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub feed_settings: FeedSettings,
    /// Set when swipes are kept in Postgres; probed by the health check
    pub postgres: Option<Arc<PostgresSwipeStore>>,
}

impl AppState {
    /// Id of the signed-in user behind the request's bearer token
    pub fn actor_id(&self, req: &HttpRequest) -> Result<String, ApiError> {
        let token = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        self.identity
            .current_user_id(token)
            .ok_or(ApiError::Unauthorized)
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(profiles::configure)
            .configure(swipes::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(pg) => pg.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Error returned by handlers, rendered as an `ErrorResponse`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Backend failure the client may retry
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            ApiError::Unavailable(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(id) => ApiError::NotFound(format!("Profile not found: {}", id)),
            ProfileError::Invalid(msg) => ApiError::BadRequest(msg),
            ProfileError::Store(e) => e.into(),
            ProfileError::Decode(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::EmptyPayload => ApiError::BadRequest(err.to_string()),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Media(e) => e.into(),
            AccountError::Profile(e) => e.into(),
            AccountError::PhotoLimit { .. } => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Swipes(e) => e.into(),
            FeedError::Profiles(e) => e.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SelfSwipe => ApiError::BadRequest(err.to_string()),
            EngineError::Swipe(ref e) | EngineError::Reciprocity(ref e) if e.is_transient() => {
                ApiError::Unavailable(err.to_string())
            }
            EngineError::Swipe(_) | EngineError::Reciprocity(_) => ApiError::Internal(err.to_string()),
            EngineError::Store(e) => e.into(),
            EngineError::Profile(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(format!("Validation failed: {}", errors))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::profiles::AgeBounds;
    use crate::services::{DocumentSwipeStore, InMemoryDocumentStore, InMemoryMediaStore, MatchStore, StaticIdentity};

    /// State over in-memory stores where every request is made by `user_id`
    pub fn state_for(user_id: &str) -> AppState {
        let store = Arc::new(InMemoryDocumentStore::new());
        let profiles = Arc::new(ProfileRepository::new(store.clone(), "profiles", AgeBounds::default()));
        let swipes = Arc::new(DocumentSwipeStore::new(store.clone(), "swipes"));
        let matches = Arc::new(MatchStore::new(store, "matches"));
        let media = Arc::new(InMemoryMediaStore::new("https://blobs.test"));

        AppState {
            feed: Arc::new(CandidateFeed::new(profiles.clone(), swipes.clone(), 20)),
            engine: Arc::new(MatchEngine::new(swipes, matches, profiles.clone())),
            accounts: Arc::new(AccountService::new(profiles.clone(), media, 3)),
            profiles,
            identity: Arc::new(StaticIdentity::new(user_id)),
            feed_settings: FeedSettings::default(),
            postgres: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StaticIdentity;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health() {
        let state = test_support::state_for("u1");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.status, "healthy");
    }

    #[actix_web::test]
    async fn test_anonymous_request_is_unauthorized() {
        let mut state = test_support::state_for("u1");
        state.identity = Arc::new(StaticIdentity::anonymous());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/profiles/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[::core::prelude::v1::test]
    fn test_transient_store_error_is_retryable() {
        let err: ApiError = StoreError::Unavailable("timeout".into()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = ProfileError::NotFound("x".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
