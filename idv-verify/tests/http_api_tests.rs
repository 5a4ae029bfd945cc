//! Integration tests for idv-verify API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use helpers::*;
use http_body_util::BodyExt;
use idv_verify::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

/// Test helper: app over jane + mark with a comparator that always answers 72
fn create_test_app() -> Router {
    let comparator = Arc::new(ScriptedComparator::new(Reply::Score(72.0)));
    let (orchestrator, event_bus) = orchestrator(
        dataset(vec![jane_identity(), mark_identity()]),
        comparator,
        fast_settings(),
    );
    build_router(AppState::new(Arc::new(orchestrator), event_bus))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "idv-verify");
    assert_eq!(json["identities"], 2);
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_list_identities() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/identities").await;

    assert_eq!(status, StatusCode::OK);
    let identities = json["identities"].as_array().unwrap();
    assert_eq!(identities.len(), 2);
    assert_eq!(identities[0]["name"], "Jane Doe");
    assert_eq!(identities[0]["candidate_count"], 2);
    assert_eq!(identities[1]["index"], 1);
    assert_eq!(identities[1]["candidate_count"], 3);
}

#[tokio::test]
async fn test_ranking_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/identities/0/ranking").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["identity_index"], 0);
    let candidates = json["candidates"].as_array().unwrap();
    assert_eq!(candidates[0]["original_index"], 0);
    assert_eq!(candidates[0]["score"], 3);
    assert_eq!(candidates[0]["breakdown"]["name"], true);
    assert_eq!(candidates[1]["score"], 0);

    // Ranking has no side effects
    let (status, _) = send(&app, "GET", "/session").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ranking_unknown_identity() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/identities/7/ranking").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_numeric_index_is_bad_request() {
    let app = create_test_app();

    let (status, _) = send(&app, "GET", "/identities/jane/ranking").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_absent_before_activation() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/session").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_activate_and_follow_session() {
    let app = create_test_app();

    // Given/When: activate jane
    let (status, json) = send(&app, "POST", "/identities/0/activate").await;

    // Then: fresh session, nothing checked yet
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["identity_index"], 0);
    assert_eq!(json["generation"], 1);
    assert_eq!(json["total"], 2);
    assert_eq!(json["checked"], 0);
    assert_eq!(json["candidates"][0]["outcome"]["status"], "pending");

    // Verification proceeds in the background until drained
    let mut session = serde_json::Value::Null;
    for _ in 0..200 {
        let (status, json) = send(&app, "GET", "/session").await;
        assert_eq!(status, StatusCode::OK);
        session = json;
        if session["phase"]["phase"] == "drained" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session["phase"]["phase"], "drained");
    assert_eq!(session["cursor"], 2);
    assert_eq!(session["checked"], 2);
    assert_eq!(session["counts"]["passed"], 2);
    assert_eq!(session["candidates"][0]["outcome"]["status"], "passed");
    assert_eq!(session["candidates"][0]["outcome"]["confidence"], 72.0);

    // Switching bumps the generation
    let (status, json) = send(&app, "POST", "/identities/1/activate").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["generation"], 2);
    assert_eq!(json["identity_index"], 1);
}

#[tokio::test]
async fn test_activate_unknown_identity_records_error() {
    let app = create_test_app();

    let (status, json) = send(&app, "POST", "/identities/9/activate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");

    let (_, health) = send(&app, "GET", "/health").await;
    assert!(health["last_error"]
        .as_str()
        .unwrap()
        .contains("Unknown identity index 9"));
}

#[tokio::test]
async fn test_event_stream_connects() {
    let app = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: ConnectionStatus"));
    assert!(text.contains("data: connected"));
}
