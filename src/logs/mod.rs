//! Per-user daily logs keyed by `(user, yyyy-MM-dd, kind)`.

mod dto;
pub mod handlers;
pub mod model;
mod store;

use crate::state::AppState;
use axum::Router;

pub use model::{date_key, parse_date, today, LogKind};
pub use store::DailyLogStore;

pub fn router() -> Router<AppState> {
    handlers::log_routes()
}
