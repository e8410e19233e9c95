//! Prompt templates, the executor that runs them, and the multi-step flows
//! built on top.

pub mod composite;
mod dto;
pub mod executor;
pub mod handlers;
pub mod registry;
pub mod schema;
pub mod template;

use crate::state::AppState;
use axum::Router;

pub use executor::{FlowExecutor, SpeechSettings};
pub use registry::TemplateRegistry;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::catalog_routes())
        .merge(handlers::run_routes())
}
