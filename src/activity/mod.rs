//! Workout accumulation, weekly and monthly roll-ups, and daily goals.

pub mod handlers;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::activity_routes()
}
