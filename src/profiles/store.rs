use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::model::{profile_shape, UserProfile};
use crate::error::StoreError;
use crate::flows::schema::Violation;
use crate::storage::{DocPath, Document, DocumentStore};

const WHAT: &str = "user profile";

#[derive(Clone)]
pub struct ProfileStore {
    docs: Arc<dyn DocumentStore>,
}

impl ProfileStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    fn path(user: Uuid) -> DocPath {
        DocPath::new(user, "profile", "main")
    }

    fn checked(input: Value) -> Result<Document, StoreError> {
        let shape = profile_shape();
        shape.validate(&input).map_err(|violation| StoreError::Invalid {
            what: WHAT.into(),
            violation,
        })?;
        match shape.prune(input) {
            Value::Object(doc) => Ok(doc),
            _ => Err(StoreError::Invalid {
                what: WHAT.into(),
                violation: Violation::root("expected object"),
            }),
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let Some(doc) = self
            .docs
            .get(&Self::path(user))
            .await
            .map_err(|e| StoreError::retrieve(WHAT, e))?
        else {
            return Ok(None);
        };
        let mut profile: UserProfile = serde_json::from_value(Value::Object(doc))
            .map_err(|e| StoreError::retrieve(WHAT, e))?;
        profile.id = user;
        Ok(Some(profile))
    }

    /// Replaces the whole profile.
    #[instrument(skip(self, input))]
    pub async fn create(&self, user: Uuid, input: Value) -> Result<(), StoreError> {
        let mut doc = Self::checked(input)?;
        doc.insert("id".into(), Value::String(user.to_string()));
        self.docs
            .set(&Self::path(user), doc)
            .await
            .map_err(|e| StoreError::update(WHAT, e))?;
        debug!("profile written");
        Ok(())
    }

    /// Merges the given fields into the profile, creating it if needed.
    #[instrument(skip(self, partial))]
    pub async fn update(&self, user: Uuid, partial: Value) -> Result<(), StoreError> {
        let mut doc = Self::checked(partial)?;
        doc.insert("id".into(), Value::String(user.to_string()));
        self.docs
            .merge(&Self::path(user), doc)
            .await
            .map_err(|e| StoreError::update(WHAT, e))?;
        debug!("profile merged");
        Ok(())
    }

    /// Creates a minimal profile for an account that has none; existing
    /// profiles are left untouched.
    #[instrument(skip(self))]
    pub async fn ensure(&self, user: Uuid, email: &str) -> Result<(), StoreError> {
        let existing = self
            .docs
            .get(&Self::path(user))
            .await
            .map_err(|e| StoreError::retrieve(WHAT, e))?;
        if existing.is_some() {
            return Ok(());
        }
        warn!(user_id = %user, "account has no profile; creating one");
        self.create(user, serde_json::json!({ "email": email })).await
    }
}
