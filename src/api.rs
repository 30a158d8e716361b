// HTTP surface - the profile and listing pages' operations over JSON

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::middleware::{viewer_context_middleware, Vc},
    models::{ListingId, Review, UserId},
    services::{FollowCounts, ListingDetail, RelationshipOutcome, ReviewSummary, UserProfile},
};

#[derive(Debug, Serialize)]
pub struct FollowStatus {
    pub is_following: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<Review>,
    pub summary: ReviewSummary,
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/users/{user_id}/profile", get(get_profile))
        .route(
            "/users/{user_id}/follow",
            get(get_follow_status).post(follow_user).delete(unfollow_user),
        )
        .route("/users/{user_id}/follow-counts", get(get_follow_counts))
        .route("/users/{user_id}/reviews", get(get_reviews))
        .route("/listings/{listing_id}", get(get_listing))
        .route("/session", delete(sign_out))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn parse_user_id(raw: &str) -> AppResult<UserId> {
    UserId::new(raw).map_err(|e| AppError::BadRequest(format!("Invalid user id '{}': {}", raw, e)))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = state.store.backend_name();
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "backend": backend }))),
        Err(e) => {
            error!(error = %e, backend, "Document store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "backend": backend })),
            )
        }
    }
}

async fn get_profile(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<UserProfile>> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.profiles.user_profile(&vc, &user_id).await?))
}

async fn get_follow_status(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<FollowStatus>> {
    let target = parse_user_id(&user_id)?;
    let is_following = state
        .relationships
        .is_following(vc.user_id.as_ref(), &target)
        .await?;
    Ok(Json(FollowStatus { is_following }))
}

async fn follow_user(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<RelationshipOutcome>> {
    let viewer = vc.require_user()?;
    let target = parse_user_id(&user_id)?;
    Ok(Json(state.relationships.follow(viewer, &target).await?))
}

async fn unfollow_user(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<RelationshipOutcome>> {
    let viewer = vc.require_user()?;
    let target = parse_user_id(&user_id)?;
    Ok(Json(state.relationships.unfollow(viewer, &target).await?))
}

async fn get_follow_counts(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<FollowCounts>> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.relationships.follow_counts(&user_id).await?))
}

async fn get_reviews(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<ReviewsResponse>> {
    let user_id = parse_user_id(&user_id)?;
    let reviews = state.reviews.reviews_for(&user_id).await?;
    let summary = ReviewSummary::from_reviews(&reviews);
    Ok(Json(ReviewsResponse { reviews, summary }))
}

async fn get_listing(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(listing_id): AxumPath<String>,
) -> AppResult<Json<ListingDetail>> {
    let listing_id = ListingId::new(&listing_id)
        .map_err(|e| AppError::BadRequest(format!("Invalid listing id '{}': {}", listing_id, e)))?;
    Ok(Json(state.profiles.listing_detail(&vc, &listing_id).await?))
}

async fn sign_out(State(state): State<AppState>, vc: Vc) -> AppResult<Json<Value>> {
    let token = vc
        .session_token
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("No active session".to_string()))?;
    state.auth.sign_out(token).await?;
    Ok(Json(json!({ "signed_out": true })))
}
