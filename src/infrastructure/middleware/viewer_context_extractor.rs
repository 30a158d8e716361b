// ViewerContext Extractor - hands the middleware's ViewerContext to handlers

use crate::infrastructure::viewer::ViewerContext;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;

/// Cheap-to-clone handle on the request's ViewerContext.
///
/// ```ignore
/// async fn handler(vc: Vc) -> impl IntoResponse {
///     let viewer = vc.require_user()?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    pub fn arc(self) -> Arc<ViewerContext> {
        self.0
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Vc {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

// Fails with 500 if the viewer middleware was not installed on the route
impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR);

        async move { vc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;

    #[test]
    fn test_vc_deref() {
        let viewer = Arc::new(ViewerContext::authenticated(
            UserId::new("alice").unwrap(),
            "token".to_string(),
        ));
        let vc = Vc::new(viewer);

        assert!(vc.is_authenticated());
        assert_eq!(vc.require_user().unwrap().as_str(), "alice");
        assert_eq!(vc.arc().session_token.as_deref(), Some("token"));
    }
}
