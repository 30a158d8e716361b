// Cached Store - read-through LRU decorator around any DocumentStore
// Point reads are served from memory; every commit evicts the paths it wrote.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::document_store::{
    CollectionPath, Document, DocumentPath, DocumentStore, WriteBatch,
};

struct CacheState {
    entries: Cache<DocumentPath, Document>,
    /// Bumped on every commit; a read only populates the cache if no commit
    /// happened while it was in flight
    generation: u64,
}

pub struct CachedDocumentStore {
    inner: Arc<dyn DocumentStore>,
    state: Mutex<CacheState>,
}

impl CachedDocumentStore {
    /// Wrap `inner`, or return it unchanged when `capacity` is zero
    pub fn wrap(inner: Arc<dyn DocumentStore>, capacity: usize) -> Arc<dyn DocumentStore> {
        match Cache::new(capacity) {
            Some(entries) => Arc::new(Self {
                inner,
                state: Mutex::new(CacheState {
                    entries,
                    generation: 0,
                }),
            }),
            None => inner,
        }
    }

    pub async fn cached_entries(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

#[async_trait]
impl DocumentStore for CachedDocumentStore {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn health_check(&self) -> AppResult<()> {
        self.inner.health_check().await
    }

    async fn get(&self, path: &DocumentPath) -> AppResult<Option<Document>> {
        let generation = {
            let mut state = self.state.lock().await;
            if let Some(doc) = state.entries.get(path) {
                debug!(path = %path, "document cache hit");
                return Ok(Some(doc.clone()));
            }
            state.generation
        };

        let loaded = self.inner.get(path).await?;
        if let Some(doc) = &loaded {
            let mut state = self.state.lock().await;
            if state.generation == generation {
                state.entries.insert(path.clone(), doc.clone());
            }
        }
        Ok(loaded)
    }

    async fn list(&self, collection: &CollectionPath) -> AppResult<Vec<Document>> {
        self.inner.list(collection).await
    }

    async fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Document>> {
        self.inner.query_eq(collection, field, value).await
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        let written: Vec<DocumentPath> = batch.written_paths().cloned().collect();
        let result = self.inner.commit(batch).await;

        let mut state = self.state.lock().await;
        state.generation += 1;
        for path in &written {
            state.entries.remove(path);
        }
        result
    }
}
