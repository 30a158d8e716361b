use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::AppResult;
use crate::infrastructure::document_store::DocumentStore;
use crate::models::{paths, Review, UserId};

/// Derived review figures for one lister; never stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub average_score: f64,
    pub count: u64,
}

impl ReviewSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self::default();
        }
        let total: f64 = reviews.iter().map(|review| review.score).sum();
        Self {
            average_score: total / reviews.len() as f64,
            count: reviews.len() as u64,
        }
    }
}

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn DocumentStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Reviews left for `lister`. Documents that do not decode as a review are skipped.
    pub async fn reviews_for(&self, lister: &UserId) -> AppResult<Vec<Review>> {
        let docs = self
            .store
            .query_eq(&paths::reviews(), "listerID", &Value::from(lister.as_str()))
            .await?;

        Ok(docs
            .into_iter()
            .filter_map(|doc| match doc.decode::<Review>() {
                Ok(review) => Some(review),
                Err(e) => {
                    warn!(path = %doc.path, error = %e, "Skipping malformed review");
                    None
                }
            })
            .collect())
    }

    pub async fn aggregate_reviews(&self, lister: &UserId) -> AppResult<ReviewSummary> {
        let reviews = self.reviews_for(lister).await?;
        Ok(ReviewSummary::from_reviews(&reviews))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::document_store::{to_document_data, DocumentPath};
    use crate::infrastructure::memory_store::MemoryStore;
    use serde_json::json;

    async fn add_review(store: &MemoryStore, id: &str, body: serde_json::Value) {
        store
            .set(&DocumentPath::new("Reviews", id), to_document_data(&body).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_reviews_yields_zero_summary() {
        let service = ReviewService::new(Arc::new(MemoryStore::new()));
        let summary = service
            .aggregate_reviews(&UserId::new("bob").unwrap())
            .await
            .unwrap();
        assert_eq!(summary, ReviewSummary { average_score: 0.0, count: 0 });
    }

    #[tokio::test]
    async fn test_average_of_matching_reviews() {
        let store = Arc::new(MemoryStore::new());
        add_review(&store, "r1", json!({"reviewerID": "alice", "listerID": "bob", "score": 3})).await;
        add_review(&store, "r2", json!({"reviewerID": "carol", "listerID": "bob", "score": 5})).await;
        add_review(&store, "r3", json!({"reviewerID": "bob", "listerID": "carol", "score": 1})).await;

        let service = ReviewService::new(store);
        let summary = service
            .aggregate_reviews(&UserId::new("bob").unwrap())
            .await
            .unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average_score, 4.0);
    }

    #[tokio::test]
    async fn test_malformed_review_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        add_review(&store, "r1", json!({"listerID": "bob", "score": 4})).await;
        add_review(&store, "r2", json!({"listerID": "bob", "score": "great"})).await;

        let service = ReviewService::new(store);
        let reviews = service.reviews_for(&UserId::new("bob").unwrap()).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].score, 4.0);
    }
}
