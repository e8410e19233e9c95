use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::model::{OnboardingReply, UserProfile};
use super::services::onboard;
use crate::{auth::jwt::AuthUser, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).put(put_profile).patch(patch_profile),
        )
        .route("/onboarding", post(post_onboarding))
}

async fn load(state: &AppState, user_id: Uuid) -> Result<Json<UserProfile>, (StatusCode, String)> {
    match state.profiles.get(user_id).await? {
        Some(p) => Ok(Json(p)),
        None => {
            warn!(user_id = %user_id, "profile not found");
            Err((StatusCode::NOT_FOUND, "Profile not found".into()))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    load(&state, user_id).await
}

#[instrument(skip(state, body))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    state.profiles.create(user_id, body).await?;
    load(&state, user_id).await
}

#[instrument(skip(state, body))]
pub async fn patch_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    state.profiles.update(user_id, body).await?;
    load(&state, user_id).await
}

#[instrument(skip(state, body))]
pub async fn post_onboarding(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<OnboardingReply>, (StatusCode, String)> {
    let reply = onboard(&state.flows, &state.profiles, user_id, body).await?;
    Ok(Json(reply))
}
