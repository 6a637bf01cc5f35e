use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use restart::{
    db::{Collection, EntityStore, MemoryEntityStore},
    services::AdminPolicy,
    AppState, Config,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const VIEWER: &str = "a@x.com";

async fn seeded_store() -> Arc<MemoryEntityStore> {
    let store = Arc::new(MemoryEntityStore::new());
    store
        .seed(
            Collection::SocialProfile,
            vec![
                json!({ "email": VIEWER, "nickname": "Ada", "location": "Tel Aviv", "interests": ["hiking"] }),
                json!({ "email": "b@x.com", "nickname": "Bea", "location": "Tel Aviv", "interests": ["hiking"], "created_date": "2024-01-02" }),
                json!({ "email": "c@x.com", "nickname": "Cyd", "location": "Haifa", "interests": ["reading"], "created_date": "2024-01-03" }),
            ],
        )
        .await;
    store
        .seed(
            Collection::Article,
            vec![
                json!({ "title": "Starting over at 55", "status": "published" }),
                json!({ "title": "Unfinished", "status": "draft" }),
            ],
        )
        .await;
    store
        .seed(Collection::User, vec![json!({ "email": VIEWER, "subscription_status": "active" })])
        .await;
    store
}

fn app(store: Arc<MemoryEntityStore>) -> Router {
    let config = Config::from_lookup(|key| match key {
        "ENTITY_API_URL" => Some("http://entities.invalid".to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(store, None, AdminPolicy::from_csv("ops@x.com"));
    restart::create_router(state, &config)
}

async fn send(app: &Router, method: &str, uri: &str, viewer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(viewer) = viewer {
        builder = builder.header("x-viewer-email", viewer);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

fn emails(discovery: &Value) -> Vec<String> {
    discovery["profiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["email"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_check_is_public() {
    let app = app(seeded_store().await);
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn discover_requires_viewer_header() {
    let app = app(seeded_store().await);
    let (status, body) = send(&app, "GET", "/api/discover", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn discover_filters_and_hides_self() {
    let app = app(seeded_store().await);

    let (status, body) = send(&app, "GET", "/api/discover", Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(emails(&body), vec!["c@x.com", "b@x.com"]);
    assert_eq!(body["own_profile"]["nickname"], "Ada");

    let (_, body) = send(&app, "GET", "/api/discover?location=tel&interest=hiking", Some(VIEWER), None).await;
    assert_eq!(emails(&body), vec!["b@x.com"]);
}

#[tokio::test]
async fn connection_lifecycle() {
    let store = seeded_store().await;
    let app = app(store.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/connections",
        Some(VIEWER),
        Some(json!({ "recipient_email": "b@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["recipient_email"], "b@x.com");
    assert_eq!(body["notifications"]["outcomes"][0]["state"], "sent");
    assert_eq!(body["notifications"]["outcomes"][1]["state"], "skipped");

    // Pending members drop out of discovery
    let (_, discovery) = send(&app, "GET", "/api/discover", Some(VIEWER), None).await;
    assert_eq!(emails(&discovery), vec!["c@x.com"]);
    assert_eq!(discovery["statuses"]["b@x.com"], "pending");

    let (status, _) = send(
        &app,
        "POST",
        "/api/connections",
        Some(VIEWER),
        Some(json!({ "recipient_email": "b@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        "/api/connections/accept",
        Some("b@x.com"),
        Some(json!({ "requester_email": VIEWER })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["participants"], json!([VIEWER, "b@x.com"]));

    let (status, body) = send(&app, "GET", "/api/relationships", Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statuses"]["b@x.com"], "connected");
    assert_eq!(body["statuses"]["c@x.com"], "none");

    let notifications = store.list(Collection::Notification).await.unwrap();
    assert_eq!(notifications.len(), 2);
}

#[tokio::test]
async fn connection_errors_map_to_status_codes() {
    let app = app(seeded_store().await);

    let (status, _) = send(
        &app,
        "POST",
        "/api/connections",
        Some(VIEWER),
        Some(json!({ "recipient_email": VIEWER })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/connections",
        Some(VIEWER),
        Some(json!({ "recipient_email": "ghost@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/connections/accept",
        Some(VIEWER),
        Some(json!({ "requester_email": "c@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn withdraw_and_mark_read() {
    let store = seeded_store().await;
    let app = app(store.clone());

    let (_, body) = send(
        &app,
        "POST",
        "/api/connections",
        Some(VIEWER),
        Some(json!({ "recipient_email": "c@x.com" })),
    )
    .await;
    let id = body["record"]["id"].as_str().unwrap().to_string();

    let notification_id = store.list(Collection::Notification).await.unwrap()[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/notifications/{}/read", notification_id),
        Some("c@x.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);

    let (status, _) = send(&app, "DELETE", &format!("/api/connections/{}", id), Some("c@x.com"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/api/connections/{}", id), Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, discovery) = send(&app, "GET", "/api/discover", Some(VIEWER), None).await;
    assert_eq!(discovery["statuses"]["c@x.com"], "none");
}

#[tokio::test]
async fn degraded_discovery_reports_warnings() {
    let store = seeded_store().await;
    store.set_unavailable(Collection::Conversation, true).await;
    let app = app(store);

    let (status, body) = send(&app, "GET", "/api/discover", Some(VIEWER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warnings"], json!(["Could not load conversations"]));
    assert_eq!(emails(&body).len(), 2);
}

#[tokio::test]
async fn me_and_articles() {
    let app = app(seeded_store().await);

    let (_, me) = send(&app, "GET", "/api/me", Some(VIEWER), None).await;
    assert_eq!(me, json!({ "email": VIEWER, "is_admin": false, "is_subscribed": true }));

    let (_, ops) = send(&app, "GET", "/api/me", Some("OPS@x.com"), None).await;
    assert_eq!(ops["is_admin"], true);

    let (status, articles) = send(&app, "GET", "/api/articles", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(articles.as_array().unwrap().len(), 1);
    assert_eq!(articles[0]["title"], "Starting over at 55");
}
