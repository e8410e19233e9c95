//! Accounts and bearer tokens; everything else only sees the user id.

mod dto;
pub mod handlers;
pub mod jwt;
mod password;
mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
