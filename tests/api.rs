use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use marketplace_social::{
    api::create_router,
    app_state::AppState,
    data_seeder::seed_documents,
    error::{AppError, AppResult},
    infrastructure::{
        auth::InMemorySessions, memory_store::MemoryStore, CollectionPath, Document,
        DocumentPath, DocumentStore, WriteBatch,
    },
    models::UserId,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    sessions: Arc<InMemorySessions>,
}

impl TestApp {
    async fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let fixtures = json!({
            "Users/alice": {"username": "alice"},
            "Users/bob": {"username": "bob", "profilePic": "bob.png"},
            "listings/l1": {"title": "Desk", "price": 40, "userID": "bob", "username": "bob"},
            "Reviews/r1": {"reviewerID": "alice", "listerID": "bob", "score": 3},
            "Reviews/r2": {"reviewerID": "carol", "listerID": "bob", "score": 5}
        });
        let Value::Object(fixtures) = fixtures else {
            unreachable!()
        };
        seed_documents(store.as_ref(), fixtures).await.unwrap();

        let sessions = Arc::new(InMemorySessions::new());
        let state = AppState::from_parts(store, sessions.clone());
        Self {
            router: create_router(state),
            sessions,
        }
    }

    async fn login(&self, user: &str) -> String {
        self.sessions.issue(UserId::new(user).unwrap()).await
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], json!("memory"));
}

struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    fn backend_name(&self) -> &'static str {
        "unreachable"
    }

    async fn health_check(&self) -> AppResult<()> {
        Err(AppError::DatabaseError("connection refused".to_string()))
    }

    async fn get(&self, _path: &DocumentPath) -> AppResult<Option<Document>> {
        Err(AppError::DatabaseError("connection refused".to_string()))
    }

    async fn list(&self, _collection: &CollectionPath) -> AppResult<Vec<Document>> {
        Err(AppError::DatabaseError("connection refused".to_string()))
    }

    async fn commit(&self, _batch: WriteBatch) -> AppResult<()> {
        Err(AppError::DatabaseError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    let state = AppState::from_parts(Arc::new(UnreachableStore), Arc::new(InMemorySessions::new()));
    let app = TestApp {
        router: create_router(state),
        sessions: Arc::new(InMemorySessions::new()),
    };

    let (status, body) = app.send(Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("unavailable"));
}

#[tokio::test]
async fn test_self_follow_without_profile_document() {
    let app = TestApp::new().await;
    let token = app.login("dave").await;

    let (status, body) = app
        .send(Method::POST, "/api/v1/users/dave/follow", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["change"], json!("self_relationship"));
    assert_eq!(body["target_follow_count"], json!(0));
}

#[tokio::test]
async fn test_follow_flow_over_http() {
    let app = TestApp::new().await;
    let token = app.login("alice").await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/users/bob/follow", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_following"], json!(false));

    let (status, body) = app
        .send(Method::POST, "/api/v1/users/bob/follow", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["change"], json!("followed"));
    assert_eq!(body["target_follow_count"], json!(1));

    let (_, body) = app
        .send(Method::GET, "/api/v1/users/bob/follow-counts", None)
        .await;
    assert_eq!(body, json!({"followers": 1, "following": 0}));

    let (status, body) = app
        .send(Method::DELETE, "/api/v1/users/bob/follow", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["change"], json!("unfollowed"));
    assert_eq!(body["is_following"], json!(false));
    assert_eq!(body["viewer_following_count"], json!(0));
}

#[tokio::test]
async fn test_follow_requires_session() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::POST, "/api/v1/users/bob/follow", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], json!(401));

    // An unknown token resolves to an anonymous viewer
    let (status, _) = app
        .send(Method::POST, "/api/v1/users/bob/follow", Some("stale"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_page() {
    let app = TestApp::new().await;
    let token = app.login("alice").await;
    app.send(Method::POST, "/api/v1/users/bob/follow", Some(&token))
        .await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/users/bob/profile", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], json!("bob"));
    assert_eq!(body["listings"][0]["title"], json!("Desk"));
    assert_eq!(body["review_summary"]["average_score"], json!(4.0));
    assert_eq!(body["review_summary"]["count"], json!(2));
    assert_eq!(body["is_following"], json!(true));
    assert_eq!(body["is_own_profile"], json!(false));

    let (status, _) = app.send(Method::GET, "/api/v1/users/ghost/profile", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reviews_and_listing() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/v1/users/alice/reviews", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], json!({"average_score": 0.0, "count": 0}));

    let (status, body) = app.send(Method::GET, "/api/v1/listings/l1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"]["profilePic"], json!("bob.png"));
    assert_eq!(body["is_owner"], json!(false));
}

#[tokio::test]
async fn test_sign_out_revokes_session() {
    let app = TestApp::new().await;
    let token = app.login("alice").await;

    let (status, _) = app.send(Method::DELETE, "/api/v1/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.sessions.active_sessions().await, 0);

    let (status, _) = app.send(Method::DELETE, "/api/v1/session", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header(AUTHORIZATION, "Basic abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
