// ViewerContext Middleware - resolves the session token on every request
// and injects the resulting ViewerContext into request extensions

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::infrastructure::{auth::AuthProvider, viewer::ViewerContext};

/// Trait for application state that can resolve sessions
pub trait HasAuthProvider {
    fn auth_provider(&self) -> &Arc<dyn AuthProvider>;
}

/// Builds a request-scoped ViewerContext. Missing or unknown sessions yield an
/// anonymous viewer; handlers decide whether that is acceptable.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    T: HasAuthProvider + Clone + Send + Sync + 'static,
{
    let token = extract_bearer_token(request.headers())?;

    let viewer_context = match token {
        Some(token) => match app_state.auth_provider().current_user(&token).await {
            Ok(Some(user_id)) => ViewerContext::authenticated(user_id, token),
            Ok(None) => {
                warn!("Request carried an unknown or expired session token");
                ViewerContext::anonymous()
            }
            Err(e) => {
                error!(error = %e, "Failed to resolve session");
                return Err(StatusCode::SERVICE_UNAVAILABLE);
            }
        },
        None => ViewerContext::anonymous(),
    };

    request.extensions_mut().insert(Arc::new(viewer_context));
    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header, if any
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, StatusCode> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = auth_header.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer token123"));
        assert_eq!(
            extract_bearer_token(&headers).unwrap(),
            Some("token123".to_string())
        );
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_bearer_token(&headers), Err(StatusCode::BAD_REQUEST));

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), Err(StatusCode::BAD_REQUEST));
    }
}
