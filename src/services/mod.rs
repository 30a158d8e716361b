// Business services layered over the document store

pub mod pair_locks;
pub mod profile_service;
pub mod relationship_service;
pub mod review_service;

pub use profile_service::{ListingDetail, ProfileService, UserProfile};
pub use relationship_service::{
    FollowCounts, RelationshipChange, RelationshipOutcome, RelationshipService,
};
pub use review_service::{ReviewService, ReviewSummary};
