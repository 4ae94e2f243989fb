//! Integration tests for vigil-curator API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use vigil_common::events::{CurationEvent, EventBus};
use vigil_common::DataLayout;
use vigil_curator::{build_router, AppState, ProcessLocalHistory};

/// Test helper: temp data root with the standard directories
fn setup() -> (TempDir, AppState) {
    let temp = TempDir::new().unwrap();
    let layout = DataLayout::new(temp.path());
    layout.ensure_directories().unwrap();
    let state = AppState::new(layout, ProcessLocalHistory::new(), EventBus::new(16));
    (temp, state)
}

fn write_triple(state: &AppState, id: &str) {
    let alerts = state.layout.alerts_dir();
    std::fs::write(alerts.join(format!("{}.jpg", id)), b"clean").unwrap();
    std::fs::write(
        alerts.join(format!("{}.txt", id)),
        "2 0.400000 0.600000 0.100000 0.200000",
    )
    .unwrap();
    std::fs::write(alerts.join(format!("{}_display.jpg", id)), b"display").unwrap();
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_temp, state) = setup();
    let response = build_router(state).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "vigil-curator");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let (_temp, state) = setup();
    let response = build_router(state)
        .oneshot(get("/api/buildinfo"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

#[tokio::test]
async fn test_list_alerts_with_status_filter() {
    let (_temp, state) = setup();
    write_triple(&state, "alert_a");
    write_triple(&state, "alert_b");
    std::fs::remove_file(state.layout.alerts_dir().join("alert_b.jpg")).unwrap();

    let app = build_router(state);

    let response = app.clone().oneshot(get("/api/alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 2);

    let response = app
        .clone()
        .oneshot(get("/api/alerts?status=pending"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["alerts"][0]["id"], "alert_a");
    assert_eq!(body["alerts"][0]["status"], "pending");
    assert_eq!(body["alerts"][0]["display_name"], "alert_a_display.jpg");

    let response = app
        .oneshot(get("/api/alerts?status=archived"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["alerts"][0]["id"], "alert_b");
}

#[tokio::test]
async fn test_unknown_status_filter_rejected() {
    let (_temp, state) = setup();
    let response = build_router(state)
        .oneshot(get("/api/alerts?status=maybe"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_annotations_endpoint() {
    let (_temp, state) = setup();
    write_triple(&state, "alert_a");
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(get("/api/alerts/alert_a/annotations"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["alert_id"], "alert_a");
    assert_eq!(body["boxes"][0]["class_index"], 2);

    let response = app
        .oneshot(get("/api/alerts/alert_missing/annotations"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_annotation_is_unprocessable() {
    let (_temp, state) = setup();
    std::fs::write(state.layout.alerts_dir().join("alert_a.txt"), "not a label").unwrap();

    let response = build_router(state)
        .oneshot(get("/api/alerts/alert_a/annotations"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "MALFORMED_ANNOTATION");
}

#[tokio::test]
async fn test_decision_confirms_and_emits_event() {
    let (_temp, state) = setup();
    write_triple(&state, "alert_a");
    let mut rx = state.event_bus.subscribe();
    let layout = state.layout.clone();
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/alerts/alert_a/decision",
            json!({ "is_threat": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["already_processed"], false);

    assert!(layout.true_images_dir().join("alert_a.jpg").exists());
    assert!(layout.true_labels_dir().join("alert_a.txt").exists());

    match rx.recv().await.unwrap() {
        CurationEvent::AlertDecided { alert_id, .. } => assert_eq!(alert_id, "alert_a"),
        other => panic!("unexpected event: {:?}", other),
    }

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stats"]["confirmed_count"], 1);
    assert_eq!(body["stats"]["dismissed_count"], 0);
    assert_eq!(body["summary"]["confirmed"], 1);
    assert_eq!(body["summary"]["true_images"], 1);
}

#[tokio::test]
async fn test_decision_unknown_alert_is_not_found() {
    let (_temp, state) = setup();
    let response = build_router(state)
        .oneshot(post_json(
            "/api/alerts/alert_missing/decision",
            json!({ "is_threat": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_decision_rejects_traversal_id() {
    let (_temp, state) = setup();
    let response = build_router(state)
        .oneshot(post_json(
            "/api/alerts/..%2Fsecret/decision",
            json!({ "is_threat": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_clears_stats_and_archives() {
    let (_temp, state) = setup();
    write_triple(&state, "alert_a");
    let app = build_router(state);

    app.clone()
        .oneshot(post_json(
            "/api/alerts/alert_a/decision",
            json!({ "is_threat": false }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json("/api/reset", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stats"]["dismissed_count"], 0);

    let response = app.oneshot(get("/api/alerts")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["alerts"][0]["status"], "archived");
}

#[tokio::test]
async fn test_purge_endpoint() {
    let (_temp, state) = setup();
    write_triple(&state, "alert_a");
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(post_json("/api/alerts/purge", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["removed"], 3);

    let response = app.oneshot(get("/api/alerts")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_artifacts_served() {
    let (_temp, state) = setup();
    write_triple(&state, "alert_a");

    let response = build_router(state)
        .oneshot(get("/artifacts/alert_a_display.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"display");
}
