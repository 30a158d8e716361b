use crate::error::{AppError, AppResult};
use crate::models::UserId;

/// Who is making the current request. `user_id` is `None` for signed-out visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerContext {
    pub user_id: Option<UserId>,
    pub session_token: Option<String>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: UserId, session_token: String) -> Self {
        ViewerContext {
            user_id: Some(user_id),
            session_token: Some(session_token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The signed-in user, or `Unauthorized`
    pub fn require_user(&self) -> AppResult<&UserId> {
        self.user_id
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }

    pub fn is_viewing_self(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }
}
