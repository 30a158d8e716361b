// Document Store Interface - collection/document access for the marketplace data
// Mirrors the hosted document database the front-end talks to: documents addressed
// by `collection/id` paths, nested sub-collections, and atomic write batches.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field map stored for every document
pub type DocumentData = Map<String, Value>;

/// Path of a (possibly nested) collection, e.g. `Users` or `Users/bob/followers`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Top-level collection
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full path of a single document: its collection plus its id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    pub fn new(collection: &str, id: &str) -> Self {
        CollectionPath::root(collection).doc(id)
    }

    /// Parse `Users/bob` or `Users/bob/followers/alice`.
    /// Paths must have an even, non-zero number of non-empty segments.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.len() < 2 || segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(AppError::Validation(format!(
                "'{}' is not a document path",
                raw
            )));
        }
        let (collection, id) = segments.split_at(segments.len() - 1);
        Ok(Self {
            collection: CollectionPath(collection.join("/")),
            id: id[0].to_string(),
        })
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sub-collection nested under this document
    pub fn sub_collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}/{}", self.collection, self.id, name))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Snapshot of a stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub data: DocumentData,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Decode the document body into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            AppError::DeserializationError(format!("Failed to decode {}: {}", self.path, e))
        })
    }

    /// Integer field, treating absent or non-integer values as zero
    pub fn i64_field(&self, field: &str) -> i64 {
        integer_value(self.data.get(field))
    }
}

fn integer_value(value: Option<&Value>) -> i64 {
    value
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

/// Serialize a model into a document body
pub fn to_document_data<T: Serialize>(value: &T) -> AppResult<DocumentData> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::SerializationError(format!(
            "Documents must be JSON objects, got {}",
            other
        ))),
        Err(e) => Err(AppError::SerializationError(e.to_string())),
    }
}

/// Condition checked atomically before a batch is applied
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    Exists(DocumentPath),
    Missing(DocumentPath),
}

impl Precondition {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Precondition::Exists(path) | Precondition::Missing(path) => path,
        }
    }

    /// Evaluate against the current existence of the document
    pub fn check(&self, exists: bool) -> AppResult<()> {
        match (self, exists) {
            (Precondition::Exists(_), true) | (Precondition::Missing(_), false) => Ok(()),
            (Precondition::Exists(path), false) => Err(AppError::PreconditionFailed(format!(
                "{} does not exist",
                path
            ))),
            (Precondition::Missing(path), true) => Err(AppError::PreconditionFailed(format!(
                "{} already exists",
                path
            ))),
        }
    }
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite the whole document
    Set { path: DocumentPath, data: DocumentData },
    /// Update fields of an existing document
    Merge { path: DocumentPath, fields: DocumentData },
    /// Add `delta` to an integer field of an existing document.
    /// Saturates, and a negative delta never takes the field below zero.
    Increment {
        path: DocumentPath,
        field: String,
        delta: i64,
    },
    Delete { path: DocumentPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Set { path, .. }
            | WriteOp::Merge { path, .. }
            | WriteOp::Increment { path, .. }
            | WriteOp::Delete { path } => path,
        }
    }

    /// Compute the document state after this write. `None` means deleted.
    pub fn apply(&self, current: Option<DocumentData>) -> AppResult<Option<DocumentData>> {
        match self {
            WriteOp::Set { data, .. } => Ok(Some(data.clone())),
            WriteOp::Merge { path, fields } => {
                let mut doc =
                    current.ok_or_else(|| AppError::NotFound(format!("Document {}", path)))?;
                for (key, value) in fields {
                    doc.insert(key.clone(), value.clone());
                }
                Ok(Some(doc))
            }
            WriteOp::Increment { path, field, delta } => {
                let mut doc =
                    current.ok_or_else(|| AppError::NotFound(format!("Document {}", path)))?;
                let next = integer_value(doc.get(field)).saturating_add(*delta);
                // Decrements stop at zero; counters are never negative
                let next = if *delta < 0 { next.max(0) } else { next };
                doc.insert(field.clone(), Value::from(next));
                Ok(Some(doc))
            }
            WriteOp::Delete { .. } => Ok(None),
        }
    }
}

/// Preconditions plus writes, committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub preconditions: Vec<Precondition>,
    pub writes: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_exists(mut self, path: DocumentPath) -> Self {
        self.preconditions.push(Precondition::Exists(path));
        self
    }

    pub fn require_missing(mut self, path: DocumentPath) -> Self {
        self.preconditions.push(Precondition::Missing(path));
        self
    }

    pub fn set(mut self, path: DocumentPath, data: DocumentData) -> Self {
        self.writes.push(WriteOp::Set { path, data });
        self
    }

    /// Set a document from any serializable model
    pub fn set_value<T: Serialize>(self, path: DocumentPath, value: &T) -> AppResult<Self> {
        let data = to_document_data(value)?;
        Ok(self.set(path, data))
    }

    pub fn merge(mut self, path: DocumentPath, fields: DocumentData) -> Self {
        self.writes.push(WriteOp::Merge { path, fields });
        self
    }

    pub fn increment(mut self, path: DocumentPath, field: &str, delta: i64) -> Self {
        self.writes.push(WriteOp::Increment {
            path,
            field: field.to_string(),
            delta,
        });
        self
    }

    pub fn delete(mut self, path: DocumentPath) -> Self {
        self.writes.push(WriteOp::Delete { path });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.preconditions.is_empty() && self.writes.is_empty()
    }

    /// Every document path written by this batch
    pub fn written_paths(&self) -> impl Iterator<Item = &DocumentPath> {
        self.writes.iter().map(WriteOp::path)
    }
}

/// Document database interface used by every service
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable
    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> AppResult<Option<Document>>;

    async fn exists(&self, path: &DocumentPath) -> AppResult<bool> {
        Ok(self.get(path).await?.is_some())
    }

    /// All documents of one collection, ordered by id
    async fn list(&self, collection: &CollectionPath) -> AppResult<Vec<Document>>;

    /// Documents whose `field` equals `value`
    async fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Document>> {
        Ok(self
            .list(collection)
            .await?
            .into_iter()
            .filter(|doc| doc.data.get(field) == Some(value))
            .collect())
    }

    /// Check every precondition, then apply every write. On any error nothing is applied.
    async fn commit(&self, batch: WriteBatch) -> AppResult<()>;

    async fn set(&self, path: &DocumentPath, data: DocumentData) -> AppResult<()> {
        self.commit(WriteBatch::new().set(path.clone(), data)).await
    }

    async fn merge(&self, path: &DocumentPath, fields: DocumentData) -> AppResult<()> {
        self.commit(WriteBatch::new().merge(path.clone(), fields)).await
    }

    async fn increment(&self, path: &DocumentPath, field: &str, delta: i64) -> AppResult<()> {
        self.commit(WriteBatch::new().increment(path.clone(), field, delta))
            .await
    }

    /// Returns whether a document was removed
    async fn delete(&self, path: &DocumentPath) -> AppResult<bool> {
        let batch = WriteBatch::new()
            .require_exists(path.clone())
            .delete(path.clone());
        match self.commit(batch).await {
            Ok(()) => Ok(true),
            Err(AppError::PreconditionFailed(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
