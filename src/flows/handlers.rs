use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument};

use super::composite::{
    coach_voice, journal_voice, nutrition_advice, nutrition_insight, AdviceReply, AdviceRequest,
    InsightReply, InsightRequest, JournalEntry, VoiceCoachReply, VoiceInput,
};
use super::dto::{FlowInfo, FlowResponse};
use super::schema::Violation;
use crate::{auth::jwt::AuthUser, error::FlowError, state::AppState};

/// Inline media arrives base64-encoded inside JSON bodies.
const MEDIA_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/flows", get(list_flows))
}

pub fn run_routes() -> Router<AppState> {
    Router::new()
        .route("/flows/:name", post(run_flow))
        .route("/coach/voice", post(post_coach_voice))
        .route("/journal/voice", post(post_journal_voice))
        .route("/nutrition/advice", post(post_nutrition_advice))
        .route("/nutrition/insight", post(post_nutrition_insight))
        .layer(DefaultBodyLimit::max(MEDIA_BODY_LIMIT))
}

/// Body decoding failures count as invalid input, not as a 422.
fn decode<T: DeserializeOwned>(body: Value) -> Result<T, FlowError> {
    serde_json::from_value(body).map_err(|e| FlowError::Validation(Violation::root(e.to_string())))
}

#[instrument(skip(state))]
pub async fn list_flows(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<Vec<FlowInfo>> {
    Json(
        state
            .flows
            .registry()
            .iter()
            .map(|t| FlowInfo::from(t.as_ref()))
            .collect(),
    )
}

#[instrument(skip(state, body))]
pub async fn run_flow(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<FlowResponse>, (StatusCode, String)> {
    let output = state.flows.execute(&name, &body).await?;
    info!(user_id = %user_id, flow = %name, "flow executed");
    Ok(Json(FlowResponse { flow: name, output }))
}

#[instrument(skip(state, body))]
pub async fn post_coach_voice(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<VoiceCoachReply>, (StatusCode, String)> {
    let input: VoiceInput = decode(body)?;
    Ok(Json(coach_voice(&state.flows, &input).await?))
}

#[instrument(skip(state, body))]
pub async fn post_journal_voice(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<JournalEntry>, (StatusCode, String)> {
    let input: VoiceInput = decode(body)?;
    Ok(Json(journal_voice(&state.flows, &input).await?))
}

#[instrument(skip(state, body))]
pub async fn post_nutrition_advice(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<AdviceReply>, (StatusCode, String)> {
    let request: AdviceRequest = decode(body)?;
    Ok(Json(nutrition_advice(&state.flows, &request).await?))
}

#[instrument(skip(state, body))]
pub async fn post_nutrition_insight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<InsightReply>, (StatusCode, String)> {
    let request: InsightRequest = decode(body)?;
    Ok(Json(nutrition_insight(&state.flows, request.insight_type).await?))
}
