// RelationshipService - follow/unfollow with paired edges and denormalized counters
//
// A follow is four writes: the FollowEdge under the followed user, the FollowingEdge
// under the follower, and one counter on each user document. They are committed as a
// single WriteBatch guarded by a precondition on the FollowEdge, so the edges and the
// counters can never drift apart.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{Document, DocumentData, DocumentStore, WriteBatch};
use crate::models::{paths, EdgeKind, FollowEdge, FollowingEdge, UserId};
use crate::services::pair_locks::PairLocks;

/// What a follow/unfollow request did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipChange {
    Followed,
    AlreadyFollowing,
    Unfollowed,
    NotFollowing,
    /// Viewer and target are the same user; nothing was written
    SelfRelationship,
}

/// Denormalized counters of one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

/// Result of a relationship mutation, with counts re-read after the commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipOutcome {
    pub change: RelationshipChange,
    pub is_following: bool,
    pub target_follow_count: u64,
    pub viewer_following_count: u64,
}

#[derive(Clone)]
pub struct RelationshipService {
    store: Arc<dyn DocumentStore>,
    pair_locks: Arc<PairLocks>,
    /// Shared by mutations, exclusive for counter reconciliation
    reconcile_gate: Arc<RwLock<()>>,
}

impl RelationshipService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            pair_locks: Arc::new(PairLocks::new()),
            reconcile_gate: Arc::new(RwLock::new(())),
        }
    }

    /// Whether `viewer` follows `target`. Signed-out viewers follow nobody.
    pub async fn is_following(&self, viewer: Option<&UserId>, target: &UserId) -> AppResult<bool> {
        match viewer {
            Some(viewer) => self.store.exists(&paths::follow_edge(target, viewer)).await,
            None => Ok(false),
        }
    }

    #[instrument(skip_all, fields(viewer = %viewer, target = %target))]
    pub async fn follow(&self, viewer: &UserId, target: &UserId) -> AppResult<RelationshipOutcome> {
        if viewer == target {
            info!("You cannot follow yourself");
            return self
                .outcome(RelationshipChange::SelfRelationship, viewer, target)
                .await;
        }

        let _gate = self.reconcile_gate.read().await;
        let _pair = self.pair_locks.lock(viewer, target).await;

        let follow_edge = paths::follow_edge(target, viewer);
        if self.store.exists(&follow_edge).await? {
            info!("Already following this user");
            return self
                .outcome(RelationshipChange::AlreadyFollowing, viewer, target)
                .await;
        }

        let now = Utc::now();
        let batch = WriteBatch::new()
            .require_missing(follow_edge.clone())
            .set_value(
                follow_edge,
                &FollowEdge {
                    follower_id: viewer.clone(),
                    timestamp: now,
                },
            )?
            .increment(paths::user(target), EdgeKind::Followers.counter_field(), 1)
            .set_value(
                paths::following_edge(viewer, target),
                &FollowingEdge {
                    followed_user_id: target.clone(),
                    timestamp: now,
                },
            )?
            .increment(paths::user(viewer), EdgeKind::Following.counter_field(), 1);

        let change = match self.store.commit(batch).await {
            Ok(()) => {
                info!("Successfully followed the user");
                RelationshipChange::Followed
            }
            // Another writer on the same store got there first
            Err(AppError::PreconditionFailed(_)) => {
                info!("Follow edge appeared concurrently");
                RelationshipChange::AlreadyFollowing
            }
            Err(e) => {
                error!(error = %e, "Error following user");
                return Err(e);
            }
        };

        self.outcome(change, viewer, target).await
    }

    #[instrument(skip_all, fields(viewer = %viewer, target = %target))]
    pub async fn unfollow(&self, viewer: &UserId, target: &UserId) -> AppResult<RelationshipOutcome> {
        if viewer == target {
            info!("You cannot unfollow yourself");
            return self
                .outcome(RelationshipChange::SelfRelationship, viewer, target)
                .await;
        }

        let _gate = self.reconcile_gate.read().await;
        let _pair = self.pair_locks.lock(viewer, target).await;

        let follow_edge = paths::follow_edge(target, viewer);
        if !self.store.exists(&follow_edge).await? {
            info!("You are not following this user");
            return self
                .outcome(RelationshipChange::NotFollowing, viewer, target)
                .await;
        }

        let batch = WriteBatch::new()
            .require_exists(follow_edge.clone())
            .delete(follow_edge)
            .increment(paths::user(target), EdgeKind::Followers.counter_field(), -1)
            .delete(paths::following_edge(viewer, target))
            .increment(paths::user(viewer), EdgeKind::Following.counter_field(), -1);

        let change = match self.store.commit(batch).await {
            Ok(()) => {
                info!("Successfully unfollowed the user");
                RelationshipChange::Unfollowed
            }
            Err(AppError::PreconditionFailed(_)) => {
                info!("Follow edge disappeared concurrently");
                RelationshipChange::NotFollowing
            }
            Err(e) => {
                error!(error = %e, "Error unfollowing user");
                return Err(e);
            }
        };

        self.outcome(change, viewer, target).await
    }

    /// Stored counters of `user`; absent counters read as zero
    pub async fn follow_counts(&self, user: &UserId) -> AppResult<FollowCounts> {
        let doc = self
            .store
            .get(&paths::user(user))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user)))?;

        Ok(counts_of(&doc))
    }

    /// Like [`Self::follow_counts`], but a user without a profile document has zero counts
    async fn counts_or_zero(&self, user: &UserId) -> AppResult<FollowCounts> {
        Ok(self
            .store
            .get(&paths::user(user))
            .await?
            .map(|doc| counts_of(&doc))
            .unwrap_or_default())
    }

    /// Ids of users following `user`
    pub async fn followers(&self, user: &UserId) -> AppResult<Vec<String>> {
        self.edge_ids(EdgeKind::Followers, user).await
    }

    /// Ids of users `user` follows
    pub async fn following(&self, user: &UserId) -> AppResult<Vec<String>> {
        self.edge_ids(EdgeKind::Following, user).await
    }

    /// Recompute both counters of `user` from its edge collections and store them.
    /// Repairs counters written by clients that did not update edges and counters atomically.
    #[instrument(skip_all, fields(user = %user))]
    pub async fn reconcile_counts(&self, user: &UserId) -> AppResult<FollowCounts> {
        let _gate = self.reconcile_gate.write().await;

        let stored = self.follow_counts(user).await?;
        let actual = FollowCounts {
            followers: self.followers(user).await?.len() as u64,
            following: self.following(user).await?.len() as u64,
        };

        if stored != actual {
            warn!(
                stored_followers = stored.followers,
                stored_following = stored.following,
                followers = actual.followers,
                following = actual.following,
                "Follow counters drifted from edges, repairing"
            );
            let mut fields = DocumentData::new();
            fields.insert(
                EdgeKind::Followers.counter_field().to_string(),
                Value::from(actual.followers),
            );
            fields.insert(
                EdgeKind::Following.counter_field().to_string(),
                Value::from(actual.following),
            );
            self.store
                .commit(WriteBatch::new().merge(paths::user(user), fields))
                .await?;
        }

        Ok(actual)
    }

    async fn edge_ids(&self, kind: EdgeKind, user: &UserId) -> AppResult<Vec<String>> {
        Ok(self
            .store
            .list(&kind.collection(user))
            .await?
            .into_iter()
            .map(|doc| doc.id().to_string())
            .collect())
    }

    async fn outcome(
        &self,
        change: RelationshipChange,
        viewer: &UserId,
        target: &UserId,
    ) -> AppResult<RelationshipOutcome> {
        let (target_counts, viewer_counts) = if change == RelationshipChange::SelfRelationship {
            let counts = self.counts_or_zero(viewer).await?;
            (counts, counts)
        } else {
            (
                self.follow_counts(target).await?,
                self.follow_counts(viewer).await?,
            )
        };

        Ok(RelationshipOutcome {
            change,
            is_following: matches!(
                change,
                RelationshipChange::Followed | RelationshipChange::AlreadyFollowing
            ),
            target_follow_count: target_counts.followers,
            viewer_following_count: viewer_counts.following,
        })
    }
}

fn counts_of(doc: &Document) -> FollowCounts {
    FollowCounts {
        followers: non_negative(doc.i64_field(EdgeKind::Followers.counter_field())),
        following: non_negative(doc.i64_field(EdgeKind::Following.counter_field())),
    }
}

fn non_negative(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
