use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::models::{ProfileUpdate, RegisterQuery, UpdateProfileRequest};
use crate::routes::{ApiError, AppState};

/// Configure profile and registration routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/profiles/me", web::get().to(get_me))
        .route("/profiles/me", web::patch().to(update_me))
        .route("/profiles/me/photos/{index}", web::put().to(set_photo));
}

/// POST /api/v1/register?fullname=&email=
///
/// The request body is the raw profile photo.
async fn register(
    state: web::Data<AppState>,
    query: web::Query<RegisterQuery>,
    body: web::Bytes,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    query.validate()?;

    let profile = state
        .accounts
        .register(&uid, &query.email, &query.fullname, body.to_vec())
        .await?;

    Ok(HttpResponse::Created().json(profile))
}

/// GET /api/v1/profiles/me
///
/// A signed-in user without a stored profile gets the defaults.
async fn get_me(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    let profile = state.profiles.get_or_default(&uid).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PATCH /api/v1/profiles/me
async fn update_me(
    state: web::Data<AppState>,
    body: web::Json<UpdateProfileRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    body.validate()?;

    let update = ProfileUpdate::from(body.into_inner());
    if update.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    state.profiles.update(&uid, &update).await?;
    let profile = state.profiles.get(&uid).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /api/v1/profiles/me/photos/{index}
async fn set_photo(
    state: web::Data<AppState>,
    path: web::Path<usize>,
    body: web::Bytes,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let uid = state.actor_id(&req)?;
    let photos = state
        .accounts
        .set_photo(&uid, path.into_inner(), body.to_vec())
        .await?;
    Ok(HttpResponse::Ok().json(photos))
}
