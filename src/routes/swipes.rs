use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::models::domain::celebration_text;
use crate::models::{FeedQuery, FeedResponse, MatchListResponse, Profile, SwipeRequest, SwipeResponse};
use crate::routes::{ApiError, AppState};

/// Configure feed, swipe and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/feed", web::get().to(feed))
        .route("/swipes", web::post().to(swipe))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/reconcile", web::post().to(reconcile));
}

/// GET /api/v1/feed?limit=20
async fn feed(
    state: web::Data<AppState>,
    query: web::Query<FeedQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    let actor = state.profiles.get_or_default(&uid).await?;
    let limit = state.feed_settings.clamp(query.limit);

    let candidates: Vec<Profile> = state.feed.next_batch_with_limit(&actor, limit).await?.collect();

    tracing::debug!("Feed for {}: {} candidates", uid, candidates.len());

    Ok(HttpResponse::Ok().json(FeedResponse {
        count: candidates.len(),
        candidates,
    }))
}

/// POST /api/v1/swipes
///
/// Request body:
/// ```json
/// { "candidateId": "string", "liked": true }
/// ```
async fn swipe(
    state: web::Data<AppState>,
    body: web::Json<SwipeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    body.validate()?;

    let actor = state.profiles.get(&uid).await?;
    let candidate = state.profiles.get(&body.candidate_id).await?;

    let outcome = state.engine.process_swipe(&actor, &candidate, body.liked).await?;

    let celebration = outcome
        .is_match()
        .then(|| celebration_text(&candidate.fullname));

    Ok(HttpResponse::Ok().json(SwipeResponse { outcome, celebration }))
}

/// GET /api/v1/matches
async fn list_matches(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    let matches = state.engine.matches_for(&uid).await?;

    Ok(HttpResponse::Ok().json(MatchListResponse {
        count: matches.len(),
        matches,
    }))
}

/// POST /api/v1/matches/reconcile
///
/// Rewrites match entries a partial failure left missing.
async fn reconcile(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    let report = state.engine.reconcile(&uid).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[cfg(test)]
mod tests {
    use crate::models::{Photo, Profile};
    use crate::routes::{configure_routes, test_support::state_for, AppState};
    use crate::services::StaticIdentity;
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn seed(state: &AppState, uid: &str, name: &str, age: u8) {
        let mut profile = Profile::with_defaults(uid);
        profile.fullname = name.to_string();
        profile.age = age;
        profile.photos = vec![Photo::new(format!("https://blobs.test/{}.jpeg", uid), uid)];
        state.profiles.create(&profile).await.unwrap();
    }

    #[actix_web::test]
    async fn test_feed_excludes_self_and_respects_limit() {
        let state = state_for("me");
        seed(&state, "me", "Me", 25).await;
        for i in 0..5 {
            seed(&state, &format!("c{}", i), "Someone", 30).await;
        }
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/feed?limit=3").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["count"], 3);
        let ids: Vec<&str> = body["candidates"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["uid"].as_str())
            .collect();
        assert!(!ids.contains(&"me"));
    }

    #[actix_web::test]
    async fn test_mutual_like_celebrates() {
        let mut state = state_for("a");
        seed(&state, "a", "alice", 25).await;
        seed(&state, "b", "bob smith", 27).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/swipes")
            .set_json(json!({"candidateId": "b", "liked": true}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"]["status"], "noMatch");

        state.identity = Arc::new(StaticIdentity::new("b"));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/swipes")
            .set_json(json!({"candidateId": "a", "liked": true}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"]["status"], "matched");
        assert_eq!(body["celebration"], "You and Alice have liked each other!");

        let req = test::TestRequest::get().uri("/api/v1/matches").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["matches"][0]["uid"], "a");
    }

    #[actix_web::test]
    async fn test_match_with_photoless_candidate_still_celebrates() {
        let state = state_for("b");
        let mut alice = Profile::with_defaults("a");
        alice.fullname = "alice".to_string();
        state.profiles.create(&alice).await.unwrap();
        seed(&state, "b", "bob", 27).await;
        state
            .engine
            .process_swipe(&alice, &state.profiles.get("b").await.unwrap(), true)
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/swipes")
            .set_json(json!({"candidateId": "a", "liked": true}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["outcome"]["status"], "matchedWithoutAvatar");
        assert_eq!(body["outcome"]["withoutPhoto"][0], "a");
        assert_eq!(body["celebration"], "You and Alice have liked each other!");
    }

    #[actix_web::test]
    async fn test_swipe_on_unknown_candidate_is_not_found() {
        let state = state_for("a");
        seed(&state, "a", "Alice", 25).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/swipes")
            .set_json(json!({"candidateId": "ghost", "liked": true}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
