use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use lume_swipe::config::Settings;
use lume_swipe::core::{AccountService, CandidateFeed, MatchEngine};
use lume_swipe::routes::{self, AppState};
use lume_swipe::services::{
    AppwriteClient, CacheManager, DocumentStore, DocumentSwipeStore, JwtIdentity, MatchStore, MediaStore,
    PostgresSwipeStore, ProfileRepository, SwipeStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    // Initialize logging from the loaded settings, or defaults when loading failed
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(logging.env_filter())
        .with_target(false)
        .with_level(true);

    if logging.is_pretty() {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting Lume swipe service...");

    let settings = settings.map_err(|e| startup_error("Configuration error", e))?;

    info!("Configuration loaded successfully");

    let appwrite = Arc::new(
        AppwriteClient::new(
            settings.appwrite.endpoint.clone(),
            settings.appwrite.api_key.clone(),
            settings.appwrite.project_id.clone(),
            settings.appwrite.database_id.clone(),
            settings.appwrite.bucket_id.clone(),
            Duration::from_secs(settings.appwrite.request_timeout_secs()),
        )
        .map_err(|e| startup_error("Appwrite client error", e))?,
    );
    let documents: Arc<dyn DocumentStore> = appwrite.clone();
    let media: Arc<dyn MediaStore> = appwrite;

    info!("Appwrite client initialized");

    // Profile cache: Redis-backed when configured, in-process otherwise
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match settings.cache.redis_url.as_deref() {
        Some(url) => match CacheManager::new(url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s, Redis)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), caching in-process only", e);
                CacheManager::in_memory(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::in_memory(l1_cache_size, cache_ttl),
    };

    let profiles = Arc::new(
        ProfileRepository::new(
            documents.clone(),
            settings.collection.profiles.clone(),
            settings.profile.bounds(),
        )
        .with_cache(Arc::new(cache)),
    );

    // Swipes go to Postgres when a database URL is configured
    let (swipes, postgres): (Arc<dyn SwipeStore>, Option<Arc<PostgresSwipeStore>>) =
        match settings.database.url.as_deref() {
            Some(url) => {
                let pg = Arc::new(
                    PostgresSwipeStore::from_settings(
                        url,
                        settings.database.max_connections,
                        settings.database.min_connections,
                        settings.database.acquire_timeout_secs,
                        settings.database.idle_timeout_secs,
                    )
                    .await
                    .map_err(|e| startup_error("PostgreSQL connection error", e))?,
                );
                info!("Swipes stored in PostgreSQL");
                (pg.clone() as Arc<dyn SwipeStore>, Some(pg))
            }
            None => {
                info!("Swipes stored in collection {}", settings.collection.swipes);
                let store = DocumentSwipeStore::new(documents.clone(), settings.collection.swipes.clone());
                (Arc::new(store) as Arc<dyn SwipeStore>, None)
            }
        };

    let matches = Arc::new(MatchStore::new(documents, settings.collection.matches.clone()));

    let identity = JwtIdentity::new(settings.auth.jwt_secret.clone())
        .map_err(|e| startup_error("Auth configuration error", e))?;

    let app_state = AppState {
        feed: Arc::new(CandidateFeed::new(
            profiles.clone(),
            swipes.clone(),
            settings.feed.page_size,
        )),
        engine: Arc::new(MatchEngine::new(swipes, matches, profiles.clone())),
        accounts: Arc::new(AccountService::new(
            profiles.clone(),
            media,
            settings.profile.max_photos,
        )),
        profiles,
        identity: Arc::new(identity),
        feed_settings: settings.feed.clone(),
        postgres,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
