//! API integration tests.
//!
//! The router runs against an in-memory creation store, an in-memory
//! metadata store and mocked upstream clients.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use ck_ai::{
    CompletionClient, CompletionRequest, ImageClient, RetryPolicy, UpstreamError, UpstreamResult,
};
use ck_api::{
    create_router, ApiConfig, ApiError, ApiResult, AppState, Backends, CallerContext, TokenVerifier,
};
use ck_identity::{IdentityResult, Metadata, MetadataStore, UserRecord};
use ck_models::{CreationContent, NewCreation, Plan};
use ck_store::{CreationStore, MemoryCreationStore};
use mockall::mock;
use serde_json::{json, Value};
use tower::ServiceExt;

const FREE: &str = "free-token";
const PREMIUM: &str = "premium-token";
const OTHER: &str = "other-token";

mock! {
    Completions {}

    #[async_trait]
    impl CompletionClient for Completions {
        async fn complete(&self, request: &CompletionRequest) -> UpstreamResult<String>;
    }
}

mock! {
    Images {}

    #[async_trait]
    impl ImageClient for Images {
        async fn generate(&self, prompt: &str) -> UpstreamResult<Vec<u8>>;
    }
}

struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> ApiResult<CallerContext> {
        match token {
            FREE => Ok(CallerContext::new("user_free", Plan::Free)),
            PREMIUM => Ok(CallerContext::new("user_premium", Plan::Premium)),
            OTHER => Ok(CallerContext::new("user_other", Plan::Free)),
            _ => Err(ApiError::unauthorized("unknown token")),
        }
    }
}

#[derive(Default)]
struct Users {
    metadata: Mutex<HashMap<String, Metadata>>,
    writes: AtomicUsize,
}

impl Users {
    fn set_credits(&self, user_id: &str, credits: i64) {
        let mut meta = Metadata::new();
        meta.insert("credits".to_string(), json!(credits));
        self.metadata.lock().unwrap().insert(user_id.to_string(), meta);
    }

    fn credits(&self, user_id: &str) -> Option<i64> {
        self.metadata
            .lock()
            .unwrap()
            .get(user_id)
            .and_then(|m| m.get("credits"))
            .and_then(Value::as_i64)
    }
}

#[async_trait]
impl MetadataStore for Users {
    async fn get_user(&self, user_id: &str) -> IdentityResult<UserRecord> {
        let mut user = UserRecord::new(user_id);
        if let Some(meta) = self.metadata.lock().unwrap().get(user_id) {
            user.private_metadata = meta.clone();
        }
        Ok(user)
    }

    async fn update_private_metadata(
        &self,
        user_id: &str,
        metadata: &Metadata,
    ) -> IdentityResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .lock()
            .unwrap()
            .insert(user_id.to_string(), metadata.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    users: Arc<Users>,
    store: MemoryCreationStore,
}

fn test_app(completions: MockCompletions, images: MockImages) -> TestApp {
    let users = Arc::new(Users::default());
    let store = MemoryCreationStore::new();

    let backends = Backends {
        auth: Arc::new(StaticVerifier),
        metadata: users.clone(),
        creations: Arc::new(store.clone()),
        completions: Arc::new(completions),
        images: Arc::new(images),
    };
    let state = AppState::new(ApiConfig::default(), backends)
        .with_retry_policy(RetryPolicy::default().with_initial_delay(Duration::from_millis(1)));

    TestApp {
        router: create_router(state, None),
        users,
        store,
    }
}

fn idle_app() -> TestApp {
    test_app(MockCompletions::new(), MockImages::new())
}

fn completions_returning(text: &'static str) -> MockCompletions {
    let mut completions = MockCompletions::new();
    completions
        .expect_complete()
        .times(1)
        .returning(move |_| Ok(text.to_string()));
    completions
}

fn no_completions() -> MockCompletions {
    let mut completions = MockCompletions::new();
    completions.expect_complete().times(0);
    completions
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn send_raw(
    app: &TestApp,
    uri: &str,
    token: &str,
    body: &'static str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn insert_script(store: &MemoryCreationStore, owner: &str, prompt: &str) -> String {
    store
        .insert(NewCreation::new(
            owner,
            prompt,
            CreationContent::Script("Hook: hello".to_string()),
        ))
        .await
        .unwrap()
        .id
        .to_string()
}

const TITLES_OUTPUT: &str = "1. How To Learn Rust Fast\n\
                             2. **Rust Ownership Explained Simply**\n\
                             3. Ten Rust Tips For Beginners\n\
                             4. short";

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = idle_app();

    let (status, body) = send(&app, Method::GET, "/api/user/credits", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "message": "Unauthorized"}));

    let (status, _) = send(&app, Method::GET, "/api/user/credits", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_generated_titles_round_trip_through_get_creation() {
    let mut completions = MockCompletions::new();
    completions
        .expect_complete()
        .withf(|req| req.max_tokens == 200 && req.prompt.contains("rust for beginners"))
        .times(1)
        .returning(|_| Ok(TITLES_OUTPUT.to_string()));
    let app = test_app(completions, MockImages::new());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "rust for beginners", "platform": "YouTube"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["content"],
        json!([
            "How To Learn Rust Fast",
            "Rust Ownership Explained Simply",
            "Ten Rust Tips For Beginners"
        ])
    );
    assert_eq!(body["remainingCredits"], 19);
    assert_eq!(app.users.credits("user_free"), Some(19));

    let rows = app.store.snapshot().await;
    assert_eq!(rows.len(), 1);
    let id = rows[0].id;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/user/get-creation/{}", id),
        Some(FREE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["creation"]["type"], "title");
    assert_eq!(body["creation"]["prompt"], "rust for beginners");
    assert_eq!(body["creation"]["content"][1], "Rust Ownership Explained Simply");
    assert_eq!(body["creation"]["publish"], false);
}

#[tokio::test]
async fn test_empty_topic_never_reaches_upstream() {
    let app = test_app(no_completions(), MockImages::new());
    app.users.set_credits("user_free", 10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-script",
        Some(FREE),
        Some(json!({"topic": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "Topic required"}));
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(10));
}

#[tokio::test]
async fn test_titles_with_empty_topic_are_rejected() {
    let app = test_app(no_completions(), MockImages::new());
    app.users.set_credits("user_free", 10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "", "platform": "YouTube"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "Topic required"}));
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(10));
}

#[tokio::test]
async fn test_overlong_field_is_rejected_before_upstream() {
    let app = test_app(no_completions(), MockImages::new());
    app.users.set_credits("user_free", 10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "rust", "tone": "x".repeat(500)})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid request"));
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(10));
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let app = idle_app();
    let expected = json!({"success": false, "message": "Invalid request body"});

    let (status, body) = send_raw(&app, "/api/ai/generate-titles", FREE, r#"{"topic": "#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    let (status, body) = send_raw(&app, "/api/ai/generate-thumbnail", FREE, "[1, 2]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    let (status, body) = send_raw(&app, "/api/user/toggle-like-creation", FREE, "{").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_too_few_titles_are_not_saved_or_charged() {
    let completions =
        completions_returning("1. Only One Useful Title Here\n2. Another Useful Title Here");
    let app = test_app(completions, MockImages::new());
    app.users.set_credits("user_free", 10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "rust"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({"success": false, "message": "Generation failed"}));
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(10));
}

#[tokio::test]
async fn test_description_without_about_is_not_saved_or_charged() {
    let completions = completions_returning("TIMESTAMPS:\n00:00 Intro\n\nHASHTAGS:\n#rust");
    let app = test_app(completions, MockImages::new());
    app.users.set_credits("user_free", 10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-description",
        Some(FREE),
        Some(json!({"topic": "rust"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Generation failed");
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(10));
}

#[tokio::test]
async fn test_description_sections() {
    let completions = completions_returning(
        "ABOUT:\nLearn Rust the practical way.\n\n\
         TIMESTAMPS:\n00:00 Intro\n01:00 Ownership\n\n\
         HASHTAGS:\n#rust #coding",
    );
    let app = test_app(completions, MockImages::new());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-description",
        Some(FREE),
        Some(json!({"topic": "rust", "ctaLinks": ["https://example.com"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["about"], "Learn Rust the practical way.");
    assert_eq!(body["content"]["timestamps"], "00:00 Intro\n01:00 Ownership");
    assert_eq!(body["content"]["hashtags"], "#rust #coding");
}

#[tokio::test]
async fn test_premium_caller_is_never_metered() {
    let completions = completions_returning("**Hook**\nStop scrolling.\n\n\n\nBody goes here.");
    let app = test_app(completions, MockImages::new());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-script",
        Some(PREMIUM),
        Some(json!({"topic": "rust"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Hook\nStop scrolling.\n\nBody goes here.");
    assert_eq!(body["remainingCredits"], Value::Null);
    assert_eq!(app.users.writes.load(Ordering::SeqCst), 0);

    let (_, body) = send(&app, Method::GET, "/api/user/credits", Some(PREMIUM), None).await;
    assert_eq!(body, json!({"success": true, "remaining": null, "plan": "premium"}));
}

#[tokio::test]
async fn test_insufficient_credits() {
    let mut images = MockImages::new();
    images.expect_generate().times(0);
    let app = test_app(no_completions(), images);
    app.users.set_credits("user_free", 3);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-thumbnail",
        Some(FREE),
        Some(json!({"prompt": "a robot"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Insufficient credits. Thumbnail generation requires 5 credits."
    );

    app.users.set_credits("user_free", 0);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "rust"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "No credits left");
    assert_eq!(app.users.credits("user_free"), Some(0));
}

#[tokio::test]
async fn test_thumbnail_is_a_data_uri() {
    let mut images = MockImages::new();
    images
        .expect_generate()
        .withf(|prompt| prompt.contains("a robot"))
        .times(1)
        .returning(|_| Ok(vec![0x89, b'P', b'N', b'G']));
    let app = test_app(MockCompletions::new(), images);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-thumbnail",
        Some(FREE),
        Some(json!({"prompt": "a robot", "style": "neon"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "data:image/png;base64,iVBORw==");
    assert_eq!(body["remainingCredits"], 15);
}

#[tokio::test]
async fn test_thumbnail_upstream_failure_is_not_saved_or_charged() {
    let mut images = MockImages::new();
    images
        .expect_generate()
        .times(1)
        .returning(|_| Err(UpstreamError::from_http_status(500, "renderer crashed")));
    let app = test_app(MockCompletions::new(), images);
    app.users.set_credits("user_free", 10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-thumbnail",
        Some(FREE),
        Some(json!({"prompt": "a robot"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({"success": false, "message": "AI busy. Try again."}));
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(10));
}

#[tokio::test]
async fn test_rate_limited_upstream_is_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut completions = MockCompletions::new();
    completions.expect_complete().times(3).returning(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(UpstreamError::from_http_status(429, "slow down"))
        } else {
            Ok(TITLES_OUTPUT.to_string())
        }
    });
    let app = test_app(completions, MockImages::new());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "rust"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"].as_array().map(Vec::len), Some(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let mut completions = MockCompletions::new();
    completions
        .expect_complete()
        .times(1)
        .returning(|_| Err(UpstreamError::from_http_status(500, "boom")));
    let app = test_app(completions, MockImages::new());
    app.users.set_credits("user_free", 4);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/ai/generate-titles",
        Some(FREE),
        Some(json!({"topic": "rust"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "AI busy. Try again.");
    assert!(app.store.is_empty().await);
    assert_eq!(app.users.credits("user_free"), Some(4));
}

#[tokio::test]
async fn test_like_toggled_twice_restores_likes() {
    let app = idle_app();
    let id = insert_script(&app.store, "user_free", "rust").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/user/toggle-like-creation",
        Some(OTHER),
        Some(json!({"id": id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], json!(["user_other"]));

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/user/toggle-like-creation",
        Some(OTHER),
        Some(json!({"id": id})),
    )
    .await;
    assert_eq!(body["likes"], json!([]));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/user/toggle-like-creation",
        Some(OTHER),
        Some(json!({"id": "550e8400-e29b-41d4-a716-446655440000"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_owner_cannot_delete_or_view() {
    let app = idle_app();
    let id = insert_script(&app.store, "user_free", "rust").await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/user/delete-creation/{}", id),
        Some(OTHER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(app.store.len().await, 1);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/user/get-creation/{}", id),
        Some(OTHER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/user/delete-creation/{}", id),
        Some(FREE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted successfully");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_publish_toggle_and_community_feed() {
    let app = idle_app();
    let id = insert_script(&app.store, "user_free", "published one").await;
    insert_script(&app.store, "user_free", "private one").await;

    let uri = format!("/api/user/toggle-publish-creation/{}", id);
    let (status, _) = send(&app, Method::POST, &uri, Some(OTHER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::POST, &uri, Some(FREE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "isPublished": true}));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/user/get-published-creations",
        Some(OTHER),
        None,
    )
    .await;
    let feed = body["creations"].as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["prompt"], "published one");
    assert!(feed[0].get("userId").is_none());
}

#[tokio::test]
async fn test_dashboard_pages_and_usage() {
    let app = idle_app();
    app.users.set_credits("user_free", 15);
    for n in 0..12 {
        insert_script(&app.store, "user_free", &format!("topic {}", n)).await;
    }
    insert_script(&app.store, "user_other", "not mine").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/user/get-dashboard-overview?page=1",
        Some(FREE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCreations"], 12);
    assert_eq!(body["creations"].as_array().unwrap().len(), 2);
    assert_eq!(body["creations"][0]["prompt"], "topic 1");
    assert_eq!(body["plan"], "free");
    assert_eq!(body["usage"], json!({"used": 5, "limit": 20, "remaining": 15}));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/user/get-dashboard-overview?page=abc",
        Some(FREE),
        None,
    )
    .await;
    assert_eq!(body["creations"].as_array().unwrap().len(), 10);
    assert_eq!(body["creations"][0]["prompt"], "topic 11");
}

#[tokio::test]
async fn test_credits_initialized_on_first_read() {
    let app = idle_app();

    let (status, body) = send(&app, Method::GET, "/api/user/credits", Some(FREE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "remaining": 20, "plan": "free"}));
    assert_eq!(app.users.credits("user_free"), Some(20));
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = idle_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().contains_key("x-request-id"));

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "ok");

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_per_client_ip() {
    let app = idle_app();
    let peer: SocketAddr = "192.168.1.100:51000".parse().unwrap();

    // Rotating X-Forwarded-For does not reset the quota without a trusted proxy
    let mut limited = false;
    for i in 0..30 {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/user/credits")
                    .extension(ConnectInfo(peer))
                    .header("X-Forwarded-For", format!("10.0.0.{}", i))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }
    assert!(limited);
}
