use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use time::Date;
use tracing::{info, instrument};

use super::dto::{HistoryQuery, LogResponse};
use super::model::{date_key, parse_date, LogKind};
use super::store::DatedLog;
use crate::{auth::jwt::AuthUser, error::FlowError, state::AppState};

pub fn log_routes() -> Router<AppState> {
    Router::new()
        .route("/logs/:kind", get(list_logs))
        .route("/logs/:kind/:date", get(get_log).put(put_log))
}

fn parse_target(kind: &str, date: &str) -> Result<(LogKind, Date), (StatusCode, String)> {
    let kind = kind.parse::<LogKind>().map_err(FlowError::from)?;
    let date = parse_date(date).map_err(FlowError::from)?;
    Ok((kind, date))
}

#[instrument(skip(state))]
pub async fn get_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((kind, date)): Path<(String, String)>,
) -> Result<Json<LogResponse>, (StatusCode, String)> {
    let (kind, date) = parse_target(&kind, &date)?;
    let record = state.logs.get(user_id, date, kind).await?;
    Ok(Json(LogResponse {
        kind,
        date: date_key(date),
        record,
    }))
}

/// Merges the body into the day's log and returns the stored result.
#[instrument(skip(state, body))]
pub async fn put_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((kind, date)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<LogResponse>, (StatusCode, String)> {
    let (kind, date) = parse_target(&kind, &date)?;
    state.logs.update(user_id, date, kind, body).await?;
    let record = state.logs.get(user_id, date, kind).await?;
    info!(user_id = %user_id, %kind, date = %date_key(date), "daily log updated");
    Ok(Json(LogResponse {
        kind,
        date: date_key(date),
        record,
    }))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(kind): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<DatedLog>>, (StatusCode, String)> {
    let kind = kind.parse::<LogKind>().map_err(FlowError::from)?;
    let logs = state.logs.history(user_id, kind, q.limit()).await?;
    Ok(Json(logs))
}
