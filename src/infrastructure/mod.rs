// Core infrastructure modules
pub mod auth;            // Session resolution
pub mod cache;           // LRU cache
pub mod cached_store;    // Read-through caching decorator
pub mod document_store;  // Document store interface and write batches
pub mod memory_store;    // In-process backend
pub mod middleware;      // Viewer middleware and extractor
pub mod sqlite_store;    // SQLite backend
pub mod viewer;          // Viewer context

pub use auth::{AuthProvider, InMemorySessions};
pub use cache::Cache;
pub use cached_store::CachedDocumentStore;
pub use document_store::{
    CollectionPath, Document, DocumentData, DocumentPath, DocumentStore, Precondition, WriteBatch,
    WriteOp,
};
pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
pub use viewer::ViewerContext;
