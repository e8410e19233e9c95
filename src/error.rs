use axum::http::StatusCode;
use tracing::{error, warn};

use crate::flows::schema::Violation;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to retrieve {what}: {reason}")]
    Retrieve { what: String, reason: String },
    #[error("unable to update {what}: {reason}")]
    Update { what: String, reason: String },
    #[error("invalid {what}: {violation}")]
    Invalid { what: String, violation: Violation },
}

impl StoreError {
    pub fn retrieve(what: impl Into<String>, e: impl std::fmt::Display) -> Self {
        let what = what.into();
        error!(error = %e, %what, "document read failed");
        StoreError::Retrieve {
            what,
            reason: e.to_string(),
        }
    }

    pub fn update(what: impl Into<String>, e: impl std::fmt::Display) -> Self {
        let what = what.into();
        error!(error = %e, %what, "document write failed");
        StoreError::Update {
            what,
            reason: e.to_string(),
        }
    }
}

/// Everything an AI-backed operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("unknown flow '{0}'")]
    UnknownFlow(String),
    #[error("invalid input: {0}")]
    Validation(Violation),
    #[error("model output does not match its schema: {0}")]
    Schema(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for FlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Invalid { violation, .. } => FlowError::Validation(violation),
            other => FlowError::Store(other),
        }
    }
}

impl From<Violation> for FlowError {
    fn from(v: Violation) -> Self {
        FlowError::Validation(v)
    }
}

impl FlowError {
    pub fn status(&self) -> StatusCode {
        match self {
            FlowError::UnknownFlow(_) => StatusCode::NOT_FOUND,
            FlowError::Validation(_) => StatusCode::BAD_REQUEST,
            FlowError::Schema(_) | FlowError::Generation(_) => StatusCode::BAD_GATEWAY,
            FlowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FlowError> for (StatusCode, String) {
    fn from(e: FlowError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            error!(error = %e, %status, "request failed");
        } else {
            warn!(error = %e, %status, "request rejected");
        }
        (status, e.to_string())
    }
}

impl From<StoreError> for (StatusCode, String) {
    fn from(e: StoreError) -> Self {
        FlowError::from(e).into()
    }
}
