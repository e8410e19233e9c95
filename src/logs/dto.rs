use serde::{Deserialize, Serialize};

use super::model::LogKind;
use crate::storage::Document;

pub const DEFAULT_HISTORY_LIMIT: usize = 30;
pub const MAX_HISTORY_LIMIT: usize = 366;

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub kind: LogKind,
    pub date: String,
    /// `null` when nothing was logged that day.
    pub record: Option<Document>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps_but_keeps_zero() {
        assert_eq!(HistoryQuery { limit: None }.limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(HistoryQuery { limit: Some(0) }.limit(), 0);
        assert_eq!(HistoryQuery { limit: Some(7) }.limit(), 7);
        assert_eq!(HistoryQuery { limit: Some(10_000) }.limit(), MAX_HISTORY_LIMIT);
    }
}
