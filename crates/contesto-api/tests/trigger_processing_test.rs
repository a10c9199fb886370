//! HTTP-level tests for the trigger-processing and document-url routes,
//! with a real downstream webhook stub listening on a local socket.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use axum_test::TestServer;
use bytes::Bytes;
use contesto_api::auth::StaticSessionAuthenticator;
use contesto_api::build_router;
use contesto_api::state::AppState;
use contesto_core::models::{AuthUser, Fine, NewFine};
use contesto_core::AppConfig;
use contesto_db::{FineStore, MemoryFineStore};
use contesto_flow::webhook::sign_body;
use contesto_flow::{AlertDeduper, OpsAlerter, ProcessingWebhookClient};
use contesto_storage::{MemoryStorage, Storage};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

type Received = Arc<Mutex<Vec<(Option<String>, Bytes)>>>;

/// Downstream processing service double: records every request and
/// answers with a fixed status and body.
async fn start_stub_webhook(status: StatusCode, response_body: &'static str) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    async fn record(
        State(received): State<(Received, StatusCode, &'static str)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> (StatusCode, &'static str) {
        let (received, status, response_body) = received;
        let signature = headers
            .get("x-webhook-signature")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        if let Ok(mut seen) = received.lock() {
            seen.push((signature, body));
        }
        (status, response_body)
    }

    let app = Router::new()
        .route("/webhook", post(record))
        .with_state((Arc::clone(&received), status, response_body));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub webhook");
    let addr = listener.local_addr().expect("stub webhook addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}/webhook", addr), received)
}

fn test_config(webhook_url: &str) -> AppConfig {
    AppConfig {
        server_port: 0,
        environment: "test".to_string(),
        database_url: "postgres://unused".to_string(),
        local_storage_path: "./unused".to_string(),
        local_storage_base_url: "http://localhost/files".to_string(),
        signed_url_ttl_secs: 60,
        auth_api_url: None,
        webhook_url: webhook_url.to_string(),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        webhook_timeout_secs: 5,
        email_alerts_enabled: false,
        smtp_host: None,
        smtp_port: None,
        smtp_user: None,
        smtp_password: None,
        smtp_from: None,
        smtp_tls: true,
        alert_recipients: vec!["admin@contesto.fr".to_string()],
    }
}

struct TestApp {
    server: TestServer,
    sessions: Arc<StaticSessionAuthenticator>,
    fines: Arc<MemoryFineStore>,
    storage: Arc<MemoryStorage>,
}

fn setup_test_app(webhook_url: &str) -> TestApp {
    let sessions = Arc::new(StaticSessionAuthenticator::new());
    let fines = Arc::new(MemoryFineStore::new());
    let storage = Arc::new(MemoryStorage::new());

    let webhook = ProcessingWebhookClient::new(
        webhook_url.to_string(),
        TEST_WEBHOOK_SECRET.to_string(),
        Duration::from_secs(5),
    )
    .expect("webhook client");
    let alerter = Arc::new(OpsAlerter::new(
        None,
        vec!["admin@contesto.fr".to_string()],
        AlertDeduper::default(),
    ));

    let state = Arc::new(AppState {
        config: test_config(webhook_url),
        sessions: Arc::clone(&sessions) as Arc<dyn contesto_api::auth::SessionAuthenticator>,
        fines: Arc::clone(&fines) as Arc<dyn FineStore>,
        storage: Arc::clone(&storage) as Arc<dyn Storage>,
        webhook,
        alerter,
    });

    let server = TestServer::new(build_router(state)).expect("test server");
    TestApp {
        server,
        sessions,
        fines,
        storage,
    }
}

async fn seed_user(app: &TestApp, token: &str) -> AuthUser {
    let user = AuthUser {
        id: Uuid::new_v4(),
        email: Some("jean.dupont@example.com".to_string()),
        is_anonymous: false,
    };
    app.sessions.insert_session(token, user.clone()).await;
    user
}

async fn seed_fine(app: &TestApp, owner: Uuid) -> Fine {
    let key = format!("jean-dupont/1700000000000-abc123-avis-{}.pdf", owner);
    app.storage
        .upload(&key, "application/pdf", b"%PDF-1.4 test".to_vec())
        .await
        .expect("upload");
    app.fines
        .create_fine(NewFine {
            user_id: owner,
            file_url: key,
            file_name: "avis.pdf".to_string(),
            file_size: 13,
            user_notes: String::new(),
        })
        .await
        .expect("create fine")
}

#[tokio::test]
async fn test_trigger_processing_queues_job() {
    let (webhook_url, received) = start_stub_webhook(StatusCode::OK, r#"{"jobId":"job-9"}"#).await;
    let app = setup_test_app(&webhook_url);
    let user = seed_user(&app, "tok-1").await;
    let fine = seed_fine(&app, user.id).await;

    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .authorization_bearer("tok-1")
        .json(&json!({ "fineId": fine.id.to_string() }))
        .await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["jobId"], "job-9");

    let seen = received.lock().expect("stub requests").clone();
    assert_eq!(seen.len(), 1);
    let (signature, payload) = &seen[0];
    let expected = sign_body(TEST_WEBHOOK_SECRET, payload).expect("sign");
    assert_eq!(signature.as_deref(), Some(expected.as_str()));

    let payload: Value = serde_json::from_slice(payload).expect("payload json");
    assert_eq!(payload["fineId"], fine.id.to_string());
    assert_eq!(payload["fileName"], "avis.pdf");
}

#[tokio::test]
async fn test_trigger_processing_requires_auth() {
    let (webhook_url, received) = start_stub_webhook(StatusCode::OK, "{}").await;
    let app = setup_test_app(&webhook_url);

    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .json(&json!({ "fineId": Uuid::new_v4().to_string() }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(received.lock().expect("stub requests").is_empty());

    // An unknown token is rejected the same way.
    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .authorization_bearer("unknown-token")
        .json(&json!({ "fineId": Uuid::new_v4().to_string() }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trigger_processing_rejects_bad_payload() {
    let (webhook_url, received) = start_stub_webhook(StatusCode::OK, "{}").await;
    let app = setup_test_app(&webhook_url);
    seed_user(&app, "tok-1").await;

    // Not a UUID.
    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .authorization_bearer("tok-1")
        .json(&json!({ "fineId": "not-a-uuid" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");

    // Wrong field type still renders the JSON error envelope.
    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .authorization_bearer("tok-1")
        .json(&json!({ "fineId": 42 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");

    assert!(received.lock().expect("stub requests").is_empty());
}

#[tokio::test]
async fn test_trigger_processing_is_owner_scoped() {
    let (webhook_url, received) = start_stub_webhook(StatusCode::OK, "{}").await;
    let app = setup_test_app(&webhook_url);
    let owner = seed_user(&app, "tok-owner").await;
    let fine = seed_fine(&app, owner.id).await;
    seed_user(&app, "tok-other").await;

    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .authorization_bearer("tok-other")
        .json(&json!({ "fineId": fine.id.to_string() }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(received.lock().expect("stub requests").is_empty());
}

#[tokio::test]
async fn test_trigger_processing_reports_upstream_rejection() {
    let (webhook_url, received) =
        start_stub_webhook(StatusCode::BAD_GATEWAY, "upstream unavailable").await;
    let app = setup_test_app(&webhook_url);
    let user = seed_user(&app, "tok-1").await;
    let fine = seed_fine(&app, user.id).await;

    let response = app
        .server
        .post("/api/fines/trigger-processing")
        .authorization_bearer("tok-1")
        .json(&json!({ "fineId": fine.id.to_string() }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "UPSTREAM_REJECTED");
    assert_eq!(body["recoverable"], true);
    assert_eq!(received.lock().expect("stub requests").len(), 1);
}

#[tokio::test]
async fn test_document_url_for_own_fine() {
    let (webhook_url, _) = start_stub_webhook(StatusCode::OK, "{}").await;
    let app = setup_test_app(&webhook_url);
    let user = seed_user(&app, "tok-1").await;
    let fine = seed_fine(&app, user.id).await;

    let response = app
        .server
        .get(&format!("/api/fines/{}/document-url", fine.id))
        .authorization_bearer("tok-1")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["url"]
        .as_str()
        .expect("url string")
        .ends_with(&fine.file_url));
    assert_eq!(body["expiresInSecs"], 60);

    // Someone else's fine does not resolve.
    seed_user(&app, "tok-other").await;
    let response = app
        .server
        .get(&format!("/api/fines/{}/document-url", fine.id))
        .authorization_bearer("tok-other")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let (webhook_url, _) = start_stub_webhook(StatusCode::OK, "{}").await;
    let app = setup_test_app(&webhook_url);

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}
