//! Per-user JSON documents addressed as `users/{id}/{collection}/{doc}`.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath {
    pub user: Uuid,
    pub collection: String,
    pub doc: String,
}

impl DocPath {
    pub fn new(user: Uuid, collection: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            user,
            collection: collection.into(),
            doc: doc.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/{}/{}", self.user, self.collection, self.doc)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> anyhow::Result<Option<Document>>;
    /// Creates the document or overwrites the top-level keys present in `partial`.
    async fn merge(&self, path: &DocPath, partial: Document) -> anyhow::Result<()>;
    /// Replaces the whole document.
    async fn set(&self, path: &DocPath, doc: Document) -> anyhow::Result<()>;
    /// Up to `limit` documents of one collection, newest id first.
    async fn list(
        &self,
        user: Uuid,
        collection: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<(String, Document)>>;
}

fn into_document(value: Value, path: &str) -> anyhow::Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("document {} is not an object: {}", path, other),
    }
}

/// JSONB rows in the `documents` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocPath) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query_as::<_, (Json<Value>,)>(
            r#"
            SELECT data
              FROM documents
             WHERE user_id = $1 AND collection = $2 AND doc_id = $3
            "#,
        )
        .bind(path.user)
        .bind(&path.collection)
        .bind(&path.doc)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("select {}", path))?;

        row.map(|(Json(v),)| into_document(v, &path.to_string()))
            .transpose()
    }

    async fn merge(&self, path: &DocPath, partial: Document) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (user_id, collection, doc_id, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, collection, doc_id)
            DO UPDATE SET data = documents.data || EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(path.user)
        .bind(&path.collection)
        .bind(&path.doc)
        .bind(Json(Value::Object(partial)))
        .execute(&self.db)
        .await
        .with_context(|| format!("merge {}", path))?;
        Ok(())
    }

    async fn set(&self, path: &DocPath, doc: Document) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (user_id, collection, doc_id, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, collection, doc_id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(path.user)
        .bind(&path.collection)
        .bind(&path.doc)
        .bind(Json(Value::Object(doc)))
        .execute(&self.db)
        .await
        .with_context(|| format!("set {}", path))?;
        Ok(())
    }

    async fn list(
        &self,
        user: Uuid,
        collection: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<(String, Document)>> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            r#"
            SELECT doc_id, data
              FROM documents
             WHERE user_id = $1 AND collection = $2
             ORDER BY doc_id DESC
             LIMIT $3
            "#,
        )
        .bind(user)
        .bind(collection)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list users/{}/{}", user, collection))?;

        rows.into_iter()
            .map(|(id, Json(v))| {
                let doc = into_document(v, &id)?;
                Ok((id, doc))
            })
            .collect()
    }
}

/// In-process store for local runs and tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<DocPath, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> anyhow::Result<Option<Document>> {
        Ok(self.docs.read().await.get(path).cloned())
    }

    async fn merge(&self, path: &DocPath, partial: Document) -> anyhow::Result<()> {
        let mut docs = self.docs.write().await;
        let doc = docs.entry(path.clone()).or_default();
        doc.extend(partial);
        Ok(())
    }

    async fn set(&self, path: &DocPath, doc: Document) -> anyhow::Result<()> {
        self.docs.write().await.insert(path.clone(), doc);
        Ok(())
    }

    async fn list(
        &self,
        user: Uuid,
        collection: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<(String, Document)>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .rev()
            .filter(|(p, _)| p.user == user && p.collection == collection)
            .take(limit)
            .map(|(p, d)| (p.doc.clone(), d.clone()))
            .collect())
    }
}
