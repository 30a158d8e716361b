// Auth collaborator - sessions are issued by the hosted auth provider;
// this side only resolves a session token to a user and revokes it.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::UserId;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// User behind a session token, `None` when the session is unknown or signed out
    async fn current_user(&self, token: &str) -> AppResult<Option<UserId>>;

    async fn sign_out(&self, token: &str) -> AppResult<()>;
}

/// Session table held in memory, used by the server binary and tests
#[derive(Debug, Default)]
pub struct InMemorySessions {
    sessions: RwLock<HashMap<String, UserId>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `user_id` and return its bearer token
    pub async fn issue(&self, user_id: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), user_id);
        token
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl AuthProvider for InMemorySessions {
    async fn current_user(&self, token: &str) -> AppResult<Option<UserId>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn sign_out(&self, token: &str) -> AppResult<()> {
        if let Some(user_id) = self.sessions.write().await.remove(token) {
            info!(user = %user_id, "User signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_resolve_sign_out() {
        let sessions = InMemorySessions::new();
        let alice = UserId::new("alice").unwrap();
        let token = sessions.issue(alice.clone()).await;

        assert_eq!(sessions.current_user(&token).await.unwrap(), Some(alice));
        assert_eq!(sessions.current_user("unknown").await.unwrap(), None);

        sessions.sign_out(&token).await.unwrap();
        assert_eq!(sessions.current_user(&token).await.unwrap(), None);
        assert_eq!(sessions.active_sessions().await, 0);

        // Signing out twice is harmless
        sessions.sign_out(&token).await.unwrap();
    }
}
