use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Row};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{
    CollectionPath, Document, DocumentData, DocumentPath, DocumentStore, WriteBatch,
};

/// SQLite implementation of the document store.
/// Documents live in one table keyed by (collection, id) with a JSON body.
pub struct SqliteStore {
    pool: SqlitePool,
    /// SQLite allows one writer; deferred transactions racing to upgrade fail with SQLITE_BUSY
    write_lock: Mutex<()>,
}

impl SqliteStore {
    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn connect(url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid SQLite url {}: {}", url, e)))?
            .create_if_missing(true);

        // Every connection to `:memory:` opens a private database, so keep exactly one alive
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to SQLite at {}: {}", url, e))
        })?;

        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Create the documents table if it does not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_time INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create documents table: {}", e)))?;

        Ok(())
    }

    async fn load<'e, E>(executor: E, path: &DocumentPath) -> AppResult<Option<DocumentData>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = ? AND id = ?")
            .bind(path.collection().as_str().to_owned())
            .bind(path.id().to_owned())
            .fetch_optional(executor)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get document {}: {}", path, e)))?;

        match row {
            Some(row) => {
                let raw: String = row.get("data");
                Ok(Some(decode_body(path, &raw)?))
            }
            None => Ok(None),
        }
    }
}

fn decode_body(path: &DocumentPath, raw: &str) -> AppResult<DocumentData> {
    serde_json::from_str(raw).map_err(|e| {
        AppError::DeserializationError(format!("Corrupt document body at {}: {}", path, e))
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> AppResult<Option<Document>> {
        Ok(Self::load(&self.pool, path).await?.map(|data| Document {
            path: path.clone(),
            data,
        }))
    }

    async fn list(&self, collection: &CollectionPath) -> AppResult<Vec<Document>> {
        let rows = sqlx::query("SELECT id, data FROM documents WHERE collection = ? ORDER BY id")
            .bind(collection.as_str().to_owned())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to list collection {}: {}", collection, e))
            })?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let raw: String = row.get("data");
                let path = collection.doc(&id);
                let data = decode_body(&path, &raw)?;
                Ok(Document { path, data })
            })
            .collect()
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        let _writer = self.write_lock.lock().await;
        let mut tx =
            self.pool.begin().await.map_err(|e| {
                AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
            })?;

        for precondition in &batch.preconditions {
            let exists = Self::load(&mut *tx, precondition.path()).await?.is_some();
            precondition.check(exists)?;
        }

        let mut staged: BTreeMap<DocumentPath, Option<DocumentData>> = BTreeMap::new();
        for op in &batch.writes {
            let current = match staged.get(op.path()) {
                Some(state) => state.clone(),
                None => Self::load(&mut *tx, op.path()).await?,
            };
            let next = op.apply(current)?;
            staged.insert(op.path().clone(), next);
        }

        let now = chrono::Utc::now().timestamp_millis();
        for (path, state) in staged {
            match state {
                Some(data) => {
                    let body = serde_json::to_string(&data)
                        .map_err(|e| AppError::SerializationError(e.to_string()))?;
                    sqlx::query(
                        "INSERT INTO documents (collection, id, data, updated_time) VALUES (?, ?, ?, ?) \
                         ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_time = excluded.updated_time",
                    )
                    .bind(path.collection().as_str().to_owned())
                    .bind(path.id().to_owned())
                    .bind(body)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Failed to write document {} in transaction: {}", path, e))
                    })?;
                }
                None => {
                    sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                        .bind(path.collection().as_str().to_owned())
                        .bind(path.id().to_owned())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            AppError::DatabaseError(format!("Failed to delete document {} in transaction: {}", path, e))
                        })?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit transaction: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::document_store::to_document_data;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_commit_and_query() {
        let store = SqliteStore::new_in_memory().await.unwrap();
        store.health_check().await.unwrap();

        let bob = DocumentPath::new("Users", "bob");
        store
            .set(&bob, to_document_data(&json!({"username": "bob"})).unwrap())
            .await
            .unwrap();

        let batch = WriteBatch::new()
            .require_missing(DocumentPath::parse("Users/bob/followers/alice").unwrap())
            .set(
                DocumentPath::parse("Users/bob/followers/alice").unwrap(),
                to_document_data(&json!({"followerID": "alice"})).unwrap(),
            )
            .increment(bob.clone(), "followCount", 1);
        store.commit(batch.clone()).await.unwrap();

        assert_eq!(store.get(&bob).await.unwrap().unwrap().i64_field("followCount"), 1);

        // Same batch again trips the precondition and changes nothing
        assert!(store.commit(batch).await.is_err());
        assert_eq!(store.get(&bob).await.unwrap().unwrap().i64_field("followCount"), 1);

        let followers = store.list(&bob.sub_collection("followers")).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id(), "alice");
    }

    #[tokio::test]
    async fn test_rollback_on_failed_write() {
        let store = SqliteStore::new_in_memory().await.unwrap();
        let edge = DocumentPath::parse("Users/bob/followers/alice").unwrap();
        let batch = WriteBatch::new()
            .set(edge.clone(), to_document_data(&json!({"followerID": "alice"})).unwrap())
            .increment(DocumentPath::new("Users", "bob"), "followCount", 1);

        assert!(matches!(store.commit(batch).await, Err(AppError::NotFound(_))));
        assert!(!store.exists(&edge).await.unwrap());
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("market.db").display());
        let path = DocumentPath::new("listings", "l1");

        {
            let store = SqliteStore::connect(&url).await.unwrap();
            store
                .set(&path, to_document_data(&json!({"title": "Desk", "username": "bob"})).unwrap())
                .await
                .unwrap();
        }

        let reopened = SqliteStore::connect(&url).await.unwrap();
        let doc = reopened.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.data["title"], json!("Desk"));
    }
}
