// Data seeding - loads a JSON fixture of `document path -> document body`
//
// {
//   "Users/alice": { "username": "alice" },
//   "Reviews/r1": { "listerID": "alice", "reviewerID": "bob", "score": 5 }
// }

use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{DocumentData, DocumentPath, DocumentStore, WriteBatch};

/// Write every fixture document in one batch; returns how many were written
pub async fn seed_documents(store: &dyn DocumentStore, fixtures: DocumentData) -> AppResult<usize> {
    let mut batch = WriteBatch::new();
    for (raw_path, body) in fixtures {
        let path = DocumentPath::parse(&raw_path)?;
        let data = match body {
            Value::Object(data) => data,
            other => {
                return Err(AppError::Validation(format!(
                    "Fixture {} must be a JSON object, got {}",
                    raw_path, other
                )))
            }
        };
        batch = batch.set(path, data);
    }

    let count = batch.writes.len();
    store.commit(batch).await?;
    info!(documents = count, backend = store.backend_name(), "Seeded documents");
    Ok(count)
}

pub async fn seed_from_file(store: &dyn DocumentStore, path: impl AsRef<Path>) -> AppResult<usize> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::ConfigurationError(format!("Failed to read seed file {}: {}", path.display(), e))
    })?;
    let fixtures: DocumentData = serde_json::from_str(&raw)?;
    seed_documents(store, fixtures).await
}
