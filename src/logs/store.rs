use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use time::Date;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::model::{date_key, LogKind};
use crate::error::StoreError;
use crate::flows::schema::Violation;
use crate::storage::{DocPath, Document, DocumentStore};

#[derive(Debug, Clone, Serialize)]
pub struct DatedLog {
    pub date: String,
    pub record: Document,
}

/// Daily workout, nutrition and goals logs, one document per user, day and kind.
#[derive(Clone)]
pub struct DailyLogStore {
    docs: Arc<dyn DocumentStore>,
}

impl DailyLogStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    fn path(user: Uuid, date: Date, kind: LogKind) -> DocPath {
        DocPath::new(user, kind.collection(), date_key(date))
    }

    fn check_stored(kind: LogKind, doc: &Document) -> Result<(), StoreError> {
        kind.shape()
            .partial()
            .validate(&Value::Object(doc.clone()))
            .map_err(|v| StoreError::retrieve(kind.label(), format!("stored record is malformed: {}", v)))
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        user: Uuid,
        date: Date,
        kind: LogKind,
    ) -> Result<Option<Document>, StoreError> {
        let path = Self::path(user, date, kind);
        let doc = self
            .docs
            .get(&path)
            .await
            .map_err(|e| StoreError::retrieve(kind.label(), e))?;
        if let Some(doc) = &doc {
            Self::check_stored(kind, doc)?;
        }
        debug!(found = doc.is_some(), "daily log read");
        Ok(doc)
    }

    /// Merge-write: fields present in `partial` overwrite, the rest are kept.
    #[instrument(skip(self, partial))]
    pub async fn update(
        &self,
        user: Uuid,
        date: Date,
        kind: LogKind,
        partial: Value,
    ) -> Result<(), StoreError> {
        if let Err(violation) = kind.shape().partial().validate(&partial) {
            warn!(%violation, "daily log update rejected");
            return Err(StoreError::Invalid {
                what: kind.label().to_string(),
                violation,
            });
        }
        let Value::Object(partial) = partial else {
            return Err(StoreError::Invalid {
                what: kind.label().to_string(),
                violation: Violation::root("expected object"),
            });
        };
        // A stored null would break every typed read of the day.
        if let Some(field) = partial.iter().find_map(|(k, v)| v.is_null().then_some(k)) {
            let violation = Violation::new(format!("$.{}", field), "expected a value, found null");
            warn!(%violation, "daily log update rejected");
            return Err(StoreError::Invalid {
                what: kind.label().to_string(),
                violation,
            });
        }

        let path = Self::path(user, date, kind);
        self.docs
            .merge(&path, partial)
            .await
            .map_err(|e| StoreError::update(kind.label(), e))?;
        debug!(%path, "daily log merged");
        Ok(())
    }

    /// At most `limit` logs of one kind, newest date first.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        user: Uuid,
        kind: LogKind,
        limit: usize,
    ) -> Result<Vec<DatedLog>, StoreError> {
        let rows = self
            .docs
            .list(user, kind.collection(), limit)
            .await
            .map_err(|e| StoreError::retrieve(kind.label(), e))?;

        let mut out = Vec::with_capacity(rows.len());
        for (date, record) in rows {
            Self::check_stored(kind, &record)?;
            out.push(DatedLog { date, record });
        }
        Ok(out)
    }

    pub async fn get_as<T: DeserializeOwned>(
        &self,
        user: Uuid,
        date: Date,
        kind: LogKind,
    ) -> Result<Option<T>, StoreError> {
        self.get(user, date, kind)
            .await?
            .map(|doc| decode(kind, doc))
            .transpose()
    }

    pub async fn update_with<T: Serialize>(
        &self,
        user: Uuid,
        date: Date,
        kind: LogKind,
        record: &T,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(record).map_err(|e| StoreError::Invalid {
            what: kind.label().to_string(),
            violation: Violation::root(e.to_string()),
        })?;
        self.update(user, date, kind, value).await
    }

    pub async fn history_as<T: DeserializeOwned>(
        &self,
        user: Uuid,
        kind: LogKind,
        limit: usize,
    ) -> Result<Vec<(String, T)>, StoreError> {
        self.history(user, kind, limit)
            .await?
            .into_iter()
            .map(|log| Ok((log.date, decode(kind, log.record)?)))
            .collect()
    }
}

fn decode<T: DeserializeOwned>(kind: LogKind, doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::retrieve(kind.label(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::model::{parse_date, GoalsLog, WorkoutLog};
    use crate::storage::MemoryDocumentStore;
    use serde_json::json;

    fn store() -> DailyLogStore {
        DailyLogStore::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn day(s: &str) -> Date {
        parse_date(s).unwrap()
    }

    #[tokio::test]
    async fn get_on_unwritten_key_is_none() {
        let logs = store();
        let got = logs
            .get(Uuid::new_v4(), day("2024-05-01"), LogKind::Nutrition)
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let logs = store();
        let user = Uuid::new_v4();
        let d = day("2024-05-01");

        logs.update(user, d, LogKind::Workout, json!({"sessions": 1})).await.unwrap();
        logs.update(user, d, LogKind::Workout, json!({"duration": 45})).await.unwrap();

        let got = logs.get(user, d, LogKind::Workout).await.unwrap().unwrap();
        assert_eq!(Value::Object(got), json!({"sessions": 1, "duration": 45}));
    }

    #[tokio::test]
    async fn read_add_write_accumulates_sessions() {
        let logs = store();
        let user = Uuid::new_v4();
        let d = day("2024-05-01");
        logs.update(user, d, LogKind::Workout, json!({"sessions": 1})).await.unwrap();

        let mut current: WorkoutLog = logs
            .get_as(user, d, LogKind::Workout)
            .await
            .unwrap()
            .unwrap_or_default();
        current.sessions += 1.0;
        logs.update(user, d, LogKind::Workout, json!({"sessions": current.sessions}))
            .await
            .unwrap();

        let after: WorkoutLog = logs.get_as(user, d, LogKind::Workout).await.unwrap().unwrap();
        assert_eq!(after.sessions, 2.0);
    }

    #[tokio::test]
    async fn kinds_and_users_are_isolated() {
        let logs = store();
        let user = Uuid::new_v4();
        let d = day("2024-05-01");
        logs.update(user, d, LogKind::Workout, json!({"sessions": 1})).await.unwrap();

        assert!(logs.get(user, d, LogKind::Goals).await.unwrap().is_none());
        assert!(logs.get(Uuid::new_v4(), d, LogKind::Workout).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mistyped_partial_is_rejected_before_writing() {
        let logs = store();
        let user = Uuid::new_v4();
        let d = day("2024-05-01");

        let err = logs
            .update(user, d, LogKind::Workout, json!({"sessions": "two"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid { ref violation, .. } if violation.path == "$.sessions"));

        let err = logs
            .update(user, d, LogKind::Goals, json!([1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
        assert!(logs.get(user, d, LogKind::Workout).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn null_fields_are_rejected_and_typed_reads_keep_working() {
        let logs = store();
        let user = Uuid::new_v4();
        let d = day("2024-05-01");
        logs.update(user, d, LogKind::Workout, json!({"sessions": 1, "duration": 20}))
            .await
            .unwrap();

        let err = logs
            .update(user, d, LogKind::Workout, json!({"sessions": null}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid { ref violation, .. } if violation.path == "$.sessions"));

        let log: WorkoutLog = logs.get_as(user, d, LogKind::Workout).await.unwrap().unwrap();
        assert_eq!(log.sessions, 1.0);
        assert_eq!(log.duration, 20.0);
    }

    #[tokio::test]
    async fn zero_limit_returns_nothing() {
        let logs = store();
        let user = Uuid::new_v4();
        logs.update(user, day("2024-05-01"), LogKind::Workout, json!({"sessions": 1}))
            .await
            .unwrap();
        assert!(logs.history(user, LogKind::Workout, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let logs = store();
        let user = Uuid::new_v4();
        for (date, sessions) in [("2024-05-02", 2), ("2024-04-28", 1), ("2024-05-10", 3)] {
            logs.update(user, day(date), LogKind::Workout, json!({"sessions": sessions}))
                .await
                .unwrap();
        }

        let all = logs.history(user, LogKind::Workout, 10).await.unwrap();
        let dates: Vec<&str> = all.iter().map(|l| l.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-10", "2024-05-02", "2024-04-28"]);

        let two = logs.history(user, LogKind::Workout, 2).await.unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].date, "2024-05-10");
    }

    #[tokio::test]
    async fn typed_goals_round_trip() {
        let logs = store();
        let user = Uuid::new_v4();
        let d = day("2024-05-01");
        let goals: GoalsLog = serde_json::from_value(json!({
            "goals": [{"name": "Meditate", "current": 0, "target": 5, "unit": "minutes"}]
        }))
        .unwrap();
        logs.update_with(user, d, LogKind::Goals, &goals).await.unwrap();

        let back: GoalsLog = logs.get_as(user, d, LogKind::Goals).await.unwrap().unwrap();
        assert_eq!(back, goals);
    }
}
