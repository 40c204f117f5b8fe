//! End-to-end smoke tests for the full vigild stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real
//! stores, virtual resources, real event manager, real axum router) and
//! exercises the HTTP layer via `tower::ServiceExt::oneshot`: no TCP port
//! is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use vigil_adapter_http_axum::router;
use vigil_adapter_http_axum::state::AppState;
use vigil_adapter_storage_sqlite_sqlx::{Config, SqliteStateStore, SqliteTriggerHistory};
use vigil_adapter_virtual::VirtualConfig;
use vigil_app::supervisor::{EventManager, PersistenceSettings};
use vigil_domain::manager::ManagerSpec;

type Manager = EventManager<SqliteStateStore, SqliteTriggerHistory>;

const VIRTUAL: &str = r#"
    [resources.cam1]
    type = "camera"

    [resources.vision]
    type = "vision"
    detections = [{ class_name = "person", confidence = 0.9 }]

    [resources.door]
    type = "generic"
    replies = { status = "open" }

    [resources.sms]
    type = "sms"
"#;

fn spec() -> ManagerSpec {
    serde_json::from_value(json!({
        "mode": "home",
        "sms_module": "sms",
        "notification_settings": {"sms": ["+15550001"]},
        "events": [
            {
                "name": "porch",
                "modes": ["home"],
                "pause_alerting_on_event_secs": 3600,
                "rules": [{
                    "type": "detection",
                    "detector": "vision",
                    "cameras": ["cam1"],
                    "class_regex": "person",
                    "confidence_pct": 0.5
                }],
                "notifications": [{"type": "sms", "preset": "alert"}]
            },
            {
                "name": "garage",
                "modes": ["away"],
                "rules": [{
                    "type": "call",
                    "resource": "door",
                    "method": "status",
                    "result_operator": "eq",
                    "result_value": "open"
                }]
            },
            {
                "name": "attic",
                "rules": [{
                    "type": "call",
                    "resource": "ghost",
                    "method": "status",
                    "result_operator": "eq",
                    "result_value": "open"
                }]
            }
        ]
    }))
    .unwrap()
}

/// Build a fully-wired router backed by an in-memory `SQLite` database.
async fn app() -> (axum::Router, Arc<Manager>) {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let webhook = vigil_adapter_webhook_reqwest::Config::default()
        .build()
        .expect("http client should build");
    let manager = Arc::new(EventManager::new(
        Arc::new(SqliteStateStore::new(pool.clone())),
        Arc::new(SqliteTriggerHistory::new(pool)),
        Arc::new(webhook),
        PersistenceSettings::default(),
    ));

    let table = toml::from_str::<VirtualConfig>(VIRTUAL).unwrap().build();
    manager.reconfigure(spec(), table).await.unwrap();

    (router::build(AppState::new(Arc::clone(&manager))), manager)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(app: axum::Router, name: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/commands/{name}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Poll the state endpoint until `event` reaches `state`.
async fn wait_for_state(app: &axum::Router, event: &str, state: &str) -> Value {
    for _ in 0..50 {
        let (_, body) = get(app.clone(), "/api/state").await;
        if body["state"][event]["state"] == state {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("event {event} never reached {state}");
}

/// Poll the trigger history until `event` has at least one record.
async fn wait_for_records(app: &axum::Router, event: &str) -> Vec<Value> {
    for _ in 0..50 {
        let (status, body) = post(app.clone(), "get_triggered", json!({"event": event})).await;
        assert_eq!(status, StatusCode::OK);
        if let Some(records) = body["triggered"].as_array().filter(|r| !r.is_empty()) {
            return records.clone();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("no trigger recorded for {event}");
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let (app, manager) = app().await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_every_configured_event() {
    let (app, manager) = app().await;

    let (status, body) = get(app, "/api/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "home");
    assert_eq!(body["state"]["attic"]["state"], "incomplete");
    assert!(body["state"]["porch"].is_object());
    assert!(body["state"]["garage"].is_object());
    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn should_trigger_on_detection_and_record_history() {
    let (app, manager) = app().await;

    let body = wait_for_state(&app, "porch", "actioning").await;
    assert_eq!(body["state"]["porch"]["triggered_camera"], "cam1");
    assert_eq!(body["state"]["porch"]["triggered_label"], "person");

    let records = wait_for_records(&app, "porch").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["camera"], "cam1");

    let (status, deleted) = post(app, "delete_triggered", json!({"id": records[0]["id"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"total": 1}));
    manager.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn should_report_trigger_once_when_filtering_new_triggers() {
    let (app, manager) = app().await;
    let (status, _) = post(app.clone(), "trigger_event", json!({"event": "garage"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, first) = get(app.clone(), "/api/state?new_triggers_only=true").await;
    let (_, second) = get(app, "/api/state?new_triggers_only=true").await;

    assert!(first["state"]["garage"].is_object());
    assert!(second["state"].get("garage").is_none());
    manager.shutdown().await;
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_404_when_triggering_incomplete_event() {
    let (app, manager) = app().await;

    let (status, body) = post(app, "trigger_event", json!({"event": "attic"})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("attic"));
    manager.shutdown().await;
}

#[tokio::test]
async fn should_return_400_when_delete_id_is_malformed() {
    let (app, manager) = app().await;

    let (status, body) = post(app, "delete_triggered", json!({"id": "nope"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    manager.shutdown().await;
}
