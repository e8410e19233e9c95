//! User profile document and onboarding.

pub mod handlers;
pub mod model;
mod services;
mod store;

use crate::state::AppState;
use axum::Router;

pub use store::ProfileStore;

pub fn router() -> Router<AppState> {
    handlers::profile_routes()
}
