use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    data_seeder,
    infrastructure::{
        auth::AuthProvider, cached_store::CachedDocumentStore, document_store::DocumentStore,
        middleware::HasAuthProvider, sqlite_store::SqliteStore,
    },
    services::{ProfileService, RelationshipService, ReviewService},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub relationships: RelationshipService,
    pub reviews: ReviewService,
    pub profiles: ProfileService,
}

impl AppState {
    pub async fn new(config: &Config, auth: Arc<dyn AuthProvider>) -> anyhow::Result<Self> {
        let database = SqliteStore::connect(&config.database.url).await?;
        let store = CachedDocumentStore::wrap(Arc::new(database), config.cache.capacity);
        info!(
            url = %config.database.url,
            cache_capacity = config.cache.capacity,
            "Document store ready"
        );

        if let Some(seed_path) = &config.database.seed_path {
            data_seeder::seed_from_file(store.as_ref(), seed_path).await?;
        }

        Ok(Self::from_parts(store, auth))
    }

    /// Wire services over an existing store and auth provider
    pub fn from_parts(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        let relationships = RelationshipService::new(store.clone());
        let reviews = ReviewService::new(store.clone());
        let profiles = ProfileService::new(store.clone(), relationships.clone(), reviews.clone());

        Self {
            store,
            auth,
            relationships,
            reviews,
            profiles,
        }
    }
}

impl HasAuthProvider for AppState {
    fn auth_provider(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }
}
