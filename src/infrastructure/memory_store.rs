use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::infrastructure::document_store::{
    CollectionPath, Document, DocumentData, DocumentPath, DocumentStore, WriteBatch,
};

/// In-process document store. A commit holds the write lock for its whole
/// duration, so batches are applied atomically with respect to each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentPath, DocumentData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, path: &DocumentPath) -> AppResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(path).map(|data| Document {
            path: path.clone(),
            data: data.clone(),
        }))
    }

    async fn exists(&self, path: &DocumentPath) -> AppResult<bool> {
        Ok(self.documents.read().await.contains_key(path))
    }

    async fn list(&self, collection: &CollectionPath) -> AppResult<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|(path, _)| path.collection() == collection)
            .map(|(path, data)| Document {
                path: path.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        let mut documents = self.documents.write().await;

        for precondition in &batch.preconditions {
            precondition.check(documents.contains_key(precondition.path()))?;
        }

        // Stage every write first so a failing op leaves the map untouched
        let mut staged: BTreeMap<DocumentPath, Option<DocumentData>> = BTreeMap::new();
        for op in &batch.writes {
            let current = match staged.get(op.path()) {
                Some(state) => state.clone(),
                None => documents.get(op.path()).cloned(),
            };
            let next = op.apply(current)?;
            staged.insert(op.path().clone(), next);
        }

        for (path, state) in staged {
            match state {
                Some(data) => {
                    documents.insert(path, data);
                }
                None => {
                    documents.remove(&path);
                }
            }
        }
        Ok(())
    }
}
