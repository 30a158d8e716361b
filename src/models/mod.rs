// Marketplace document models - field names match the stored documents

pub mod edges;
pub mod ids;

pub use edges::EdgeKind;
pub use ids::{ListingId, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level collection names
pub mod collections {
    pub const USERS: &str = "Users";
    pub const LISTINGS: &str = "listings";
    pub const REVIEWS: &str = "Reviews";
}

/// Document and collection paths used across the services
pub mod paths {
    use super::{collections, EdgeKind, ListingId, UserId};
    use crate::infrastructure::document_store::{CollectionPath, DocumentPath};

    pub fn user(id: &UserId) -> DocumentPath {
        DocumentPath::new(collections::USERS, id.as_str())
    }

    pub fn listing(id: &ListingId) -> DocumentPath {
        DocumentPath::new(collections::LISTINGS, id.as_str())
    }

    pub fn listings() -> CollectionPath {
        CollectionPath::root(collections::LISTINGS)
    }

    pub fn reviews() -> CollectionPath {
        CollectionPath::root(collections::REVIEWS)
    }

    /// FollowEdge: `follower` follows `followed`
    pub fn follow_edge(followed: &UserId, follower: &UserId) -> DocumentPath {
        EdgeKind::Followers.edge(followed, follower)
    }

    /// FollowingEdge mirror of [`follow_edge`]
    pub fn following_edge(follower: &UserId, followed: &UserId) -> DocumentPath {
        EdgeKind::Following.edge(follower, followed)
    }
}

/// `Users/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Document id, filled in after decoding
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "profilePic", default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(rename = "followCount", default)]
    pub follow_count: i64,
    #[serde(rename = "followingCount", default)]
    pub following_count: i64,
}

/// `Users/{followed}/followers/{follower}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEdge {
    #[serde(rename = "followerID")]
    pub follower_id: UserId,
    pub timestamp: DateTime<Utc>,
}

/// `Users/{follower}/following/{followed}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowingEdge {
    #[serde(rename = "followedUserID")]
    pub followed_user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

/// `Reviews/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "reviewerID", default)]
    pub reviewer_id: String,
    #[serde(rename = "listerID")]
    pub lister_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// `listings/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "productType", default)]
    pub product_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
}
