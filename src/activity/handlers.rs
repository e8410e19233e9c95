use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::services::{
    daily_goals, log_workout_session, progress_chart, progress_forecast, replace_goals,
    today_summary, weekly_activity, weekly_report, DayActivity, MonthlyProgress,
    ProgressForecast, SessionInput, TodaySummary, WeeklyReport,
};
use crate::logs::model::{DailyGoal, WorkoutLog};
use crate::logs::today;
use crate::{auth::jwt::AuthUser, state::AppState};

pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/workouts/sessions", post(post_session))
        .route("/summary/today", get(get_today))
        .route("/reports/weekly", get(get_weekly_report).post(post_weekly_report))
        .route("/progress", get(get_progress))
        .route("/progress/forecast", post(post_forecast))
        .route("/goals/today", get(get_goals).put(put_goals))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportRequest {
    pub weekly_activity: Vec<DayActivity>,
}

#[derive(Debug, Deserialize)]
pub struct GoalsRequest {
    pub goals: Vec<DailyGoal>,
}

#[instrument(skip(state))]
pub async fn post_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SessionInput>,
) -> Result<Json<WorkoutLog>, (StatusCode, String)> {
    let log = log_workout_session(&state.logs, user_id, today(), body).await?;
    Ok(Json(log))
}

#[instrument(skip(state))]
pub async fn get_today(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TodaySummary>, (StatusCode, String)> {
    Ok(Json(today_summary(&state.logs, user_id, today()).await?))
}

/// Report over the caller's logged week.
#[instrument(skip(state))]
pub async fn get_weekly_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<WeeklyReport>, (StatusCode, String)> {
    let week = weekly_activity(&state.logs, user_id, today()).await?;
    Ok(Json(weekly_report(&state.flows, &week).await?))
}

/// Report over activity supplied by the client.
#[instrument(skip(state, body))]
pub async fn post_weekly_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<WeeklyReportRequest>,
) -> Result<Json<WeeklyReport>, (StatusCode, String)> {
    Ok(Json(weekly_report(&state.flows, &body.weekly_activity).await?))
}

#[instrument(skip(state))]
pub async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<MonthlyProgress>>, (StatusCode, String)> {
    let rows = progress_chart(&state.logs, &state.profiles, user_id, today()).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn post_forecast(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProgressForecast>, (StatusCode, String)> {
    let out =
        progress_forecast(&state.flows, &state.logs, &state.profiles, user_id, today()).await?;
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<DailyGoal>>, (StatusCode, String)> {
    Ok(Json(daily_goals(&state.flows, &state.logs, user_id, today()).await?))
}

#[instrument(skip(state, body))]
pub async fn put_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<GoalsRequest>,
) -> Result<Json<Vec<DailyGoal>>, (StatusCode, String)> {
    Ok(Json(replace_goals(&state.logs, user_id, today(), body.goals).await?))
}
