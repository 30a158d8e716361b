// ProfileService - assembles the profile and listing pages from the document store

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::DocumentStore;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{paths, Listing, ListingId, Review, User, UserId};
use crate::services::relationship_service::{FollowCounts, RelationshipService};
use crate::services::review_service::{ReviewService, ReviewSummary};

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub listings: Vec<Listing>,
    pub reviews: Vec<Review>,
    pub review_summary: ReviewSummary,
    pub follow_counts: FollowCounts,
    pub is_following: bool,
    pub is_own_profile: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    pub listing: Listing,
    /// Absent when the owner's user document is gone
    pub owner: Option<User>,
    pub is_owner: bool,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    relationships: RelationshipService,
    reviews: ReviewService,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        relationships: RelationshipService,
        reviews: ReviewService,
    ) -> Self {
        Self {
            store,
            relationships,
            reviews,
        }
    }

    pub async fn user_profile(&self, viewer: &ViewerContext, user_id: &UserId) -> AppResult<UserProfile> {
        let user = self
            .load_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user data found for {}", user_id)))?;

        let (listings, reviews, is_following) = futures::try_join!(
            self.listings_by_username(&user.username),
            self.reviews.reviews_for(user_id),
            self.relationships
                .is_following(viewer.user_id.as_ref(), user_id),
        )?;

        let review_summary = ReviewSummary::from_reviews(&reviews);
        let follow_counts = FollowCounts {
            followers: u64::try_from(user.follow_count).unwrap_or(0),
            following: u64::try_from(user.following_count).unwrap_or(0),
        };

        Ok(UserProfile {
            is_own_profile: viewer.is_viewing_self(user_id),
            user,
            listings,
            reviews,
            review_summary,
            follow_counts,
            is_following,
        })
    }

    pub async fn listing_detail(&self, viewer: &ViewerContext, listing_id: &ListingId) -> AppResult<ListingDetail> {
        let doc = self
            .store
            .get(&paths::listing(listing_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("There is no listing {}", listing_id)))?;
        let mut listing: Listing = doc.decode()?;
        listing.id = doc.id().to_string();

        let owner = match UserId::new(&listing.user_id) {
            Ok(owner_id) => self.load_user(&owner_id).await?,
            Err(_) => None,
        };
        let is_owner = viewer
            .user_id
            .as_ref()
            .is_some_and(|viewer| viewer.as_str() == listing.user_id);

        Ok(ListingDetail {
            listing,
            owner,
            is_owner,
        })
    }

    /// Listings are linked to their owner by username
    pub async fn listings_by_username(&self, username: &str) -> AppResult<Vec<Listing>> {
        if username.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .store
            .query_eq(&paths::listings(), "username", &Value::from(username))
            .await?;

        docs.into_iter()
            .map(|doc| {
                let mut listing: Listing = doc.decode()?;
                listing.id = doc.id().to_string();
                Ok(listing)
            })
            .collect()
    }

    async fn load_user(&self, user_id: &UserId) -> AppResult<Option<User>> {
        match self.store.get(&paths::user(user_id)).await? {
            Some(doc) => {
                let mut user: User = doc.decode()?;
                user.id = doc.id().to_string();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::document_store::{to_document_data, DocumentPath};
    use crate::infrastructure::memory_store::MemoryStore;
    use serde_json::json;

    async fn seeded() -> (ProfileService, RelationshipService) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let fixtures = [
            ("Users/alice", json!({"username": "alice"})),
            ("Users/bob", json!({"username": "bob", "profilePic": "bob.png"})),
            ("listings/l1", json!({"title": "Desk", "price": 40, "userID": "bob", "username": "bob"})),
            ("listings/l2", json!({"title": "Lamp", "price": 12.5, "userID": "alice", "username": "alice"})),
            ("Reviews/r1", json!({"reviewerID": "alice", "listerID": "bob", "score": 3})),
            ("Reviews/r2", json!({"reviewerID": "carol", "listerID": "bob", "score": 5})),
        ];
        for (path, body) in fixtures {
            store
                .set(&DocumentPath::parse(path).unwrap(), to_document_data(&body).unwrap())
                .await
                .unwrap();
        }
        let relationships = RelationshipService::new(store.clone());
        let reviews = ReviewService::new(store.clone());
        (
            ProfileService::new(store, relationships.clone(), reviews),
            relationships,
        )
    }

    fn uid(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_profile_as_seen_by_follower() {
        let (profiles, relationships) = seeded().await;
        relationships.follow(&uid("alice"), &uid("bob")).await.unwrap();

        let viewer = ViewerContext::authenticated(uid("alice"), "t".into());
        let profile = profiles.user_profile(&viewer, &uid("bob")).await.unwrap();

        assert_eq!(profile.user.id, "bob");
        assert_eq!(profile.listings.len(), 1);
        assert_eq!(profile.listings[0].id, "l1");
        assert_eq!(profile.review_summary.count, 2);
        assert_eq!(profile.review_summary.average_score, 4.0);
        assert_eq!(profile.follow_counts.followers, 1);
        assert!(profile.is_following);
        assert!(!profile.is_own_profile);
    }

    #[tokio::test]
    async fn test_anonymous_profile_and_missing_user() {
        let (profiles, _) = seeded().await;
        let anonymous = ViewerContext::anonymous();

        let profile = profiles.user_profile(&anonymous, &uid("alice")).await.unwrap();
        assert!(!profile.is_following);
        assert!(profile.reviews.is_empty());
        assert_eq!(profile.review_summary.average_score, 0.0);

        let err = profiles.user_profile(&anonymous, &uid("ghost")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_detail_includes_owner() {
        let (profiles, _) = seeded().await;
        let viewer = ViewerContext::authenticated(uid("bob"), "t".into());

        let detail = profiles
            .listing_detail(&viewer, &ListingId::new("l1").unwrap())
            .await
            .unwrap();
        assert_eq!(detail.listing.title, "Desk");
        assert_eq!(detail.owner.unwrap().profile_pic.as_deref(), Some("bob.png"));
        assert!(detail.is_owner);

        let missing = profiles
            .listing_detail(&viewer, &ListingId::new("nope").unwrap())
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
