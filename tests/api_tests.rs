//! End-to-end tests for the public range API
//!
//! Drives the axum router directly with `oneshot`, backed by the in-memory
//! store or by a store that is always unreachable.

mod fixtures;

use axum::body::{to_bytes, Body};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use range_vault::http::{ErrorResponse, RANGE_CREATED, RANGE_DELETED, RANGE_UPDATED};
use range_vault::store::RangeStore;
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

use fixtures::{empty_request, json_request, memory_app, range_body, unreachable_app};

async fn send(app: &Router, request: axum::http::Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn create(app: &Router, name: &str, user_id: &str) -> Response {
    send(app, json_request("POST", "/ranges", &range_body(name, user_id))).await
}

#[tokio::test]
async fn test_create_then_fetch_round_trip() {
    let (app, _store) = memory_app(Some(10));

    let response = create(&app, "BTN open", "user-1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, RANGE_CREATED);

    let list = body_json(send(&app, empty_request("GET", "/ranges")).await).await;
    let ranges = list.as_array().unwrap();
    assert_eq!(ranges.len(), 1);

    let id = ranges[0]["id"].as_str().unwrap().to_string();
    let fetched = body_json(send(&app, empty_request("GET", &format!("/ranges/{}", id))).await).await;

    let mut expected = range_body("BTN open", "user-1");
    expected["id"] = json!(id);
    assert_eq!(fetched, expected);
}

#[tokio::test]
async fn test_unknown_id_returns_null() {
    let (app, _store) = memory_app(Some(10));

    let response = send(&app, empty_request("GET", "/ranges/does-not-exist")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_list_by_user() {
    let (app, _store) = memory_app(Some(10));
    create(&app, "BTN open", "user-1").await;
    create(&app, "CO open", "user-1").await;
    create(&app, "SB open", "user-2").await;

    let mine = body_json(send(&app, empty_request("GET", "/ranges/user/user-1")).await).await;
    let names: Vec<_> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["BTN open", "CO open"]);

    let nobody = body_json(send(&app, empty_request("GET", "/ranges/user/nobody")).await).await;
    assert_eq!(nobody, json!([]));
}

#[tokio::test]
async fn test_duplicate_name_conflicts_across_users() {
    let (app, store) = memory_app(Some(10));
    create(&app, "BTN open", "user-1").await;

    let response = create(&app, "BTN open", "user-2").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let error: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(error.error, "duplicate_name");

    let stored = store.find_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_id, "user-1");
}

#[tokio::test]
async fn test_quota_boundary() {
    let (app, store) = memory_app(Some(10));

    for i in 0..10 {
        let response = create(&app, &format!("range-{}", i), "user-1").await;
        assert_eq!(response.status(), StatusCode::OK, "range {} rejected", i);
    }

    let response = create(&app, "range-10", "user-1").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "quota_exceeded");
    assert_eq!(
        body["message"],
        "User user-1 has reached the maximum limit of 10 ranges"
    );
    assert_eq!(store.count_by_user_id("user-1").await.unwrap(), 10);
}

#[tokio::test]
async fn test_quota_disabled() {
    let (app, store) = memory_app(None);

    for i in 0..12 {
        let response = create(&app, &format!("range-{}", i), "user-1").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(store.count_by_user_id("user-1").await.unwrap(), 12);
}

#[tokio::test]
async fn test_invalid_action_type_rejected_before_store() {
    let (app, store) = memory_app(Some(10));

    let mut body = range_body("BTN open", "user-1");
    body["handsRange"][1]["actions"][0]["type"] = json!("shove");

    let response = send(&app, json_request("POST", "/ranges", &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(error.error, "validation_failed");
    assert_eq!(error.field.as_deref(), Some("handsRange[1].actions[0].type"));
    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn test_action_type_is_case_insensitive() {
    let (app, _store) = memory_app(Some(10));

    let mut body = range_body("BTN open", "user-1");
    body["handsRange"][0]["actions"][0]["type"] = json!("RAISE");

    let response = send(&app, json_request("POST", "/ranges", &body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = body_json(send(&app, empty_request("GET", "/ranges")).await).await;
    assert_eq!(list[0]["handsRange"][0]["actions"][0]["type"], "raise");
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    let (app, _store) = memory_app(Some(10));

    for field in ["name", "userId", "handsRange"] {
        let mut body = range_body("BTN open", "user-1");
        body.as_object_mut().unwrap().remove(field);

        let response = send(&app, json_request("POST", "/ranges", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", field);
    }

    let mut body = range_body("BTN open", "user-1");
    body["handsRange"] = json!([]);
    let response = send(&app, json_request("POST", "/ranges", &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_snake_case_aliases_accepted() {
    let (app, store) = memory_app(Some(10));

    let body = json!({
        "name": "BB defend",
        "user_id": "user-1",
        "hands_range": [
            {"range_fraction": 0.3, "label": "any two", "actions": [{"type": "check", "percentage": 1.0}]}
        ]
    });
    let response = send(&app, json_request("POST", "/ranges", &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.find_by_user_id("user-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_replaces_range() {
    let (app, store) = memory_app(Some(10));
    create(&app, "BTN open", "user-1").await;
    let id = store.find_all().await.unwrap()[0].id.clone().unwrap();

    let mut body = range_body("BTN open (tight)", "user-1");
    body["handsRange"] = json!([
        {"rangeFraction": 0.0045, "label": "AA", "actions": [{"type": "raise", "percentage": 1.0}]}
    ]);

    let response = send(&app, json_request("PUT", &format!("/ranges/{}", id), &body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, RANGE_UPDATED);

    let stored = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.name, "BTN open (tight)");
    assert_eq!(stored.hands_range.len(), 1);
    assert_eq!(store.len().unwrap(), 1);
}

#[tokio::test]
async fn test_update_to_taken_name_conflicts() {
    let (app, store) = memory_app(Some(10));
    create(&app, "BTN open", "user-1").await;
    create(&app, "CO open", "user-1").await;
    let co = store
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.name == "CO open")
        .unwrap();

    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/ranges/{}", co.id.unwrap()),
            &range_body("BTN open", "user-1"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (app, store) = memory_app(Some(10));
    create(&app, "BTN open", "user-1").await;
    let id = store.find_all().await.unwrap()[0].id.clone().unwrap();

    let response = send(&app, empty_request("DELETE", "/ranges/unknown-id")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.len().unwrap(), 1);

    for _ in 0..2 {
        let response = send(&app, empty_request("DELETE", &format!("/ranges/{}", id))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, RANGE_DELETED);
    }
    assert!(store.is_empty().unwrap());

    // The name is free again
    assert_eq!(create(&app, "BTN open", "user-1").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_health_has_exact_keys() {
    let (app, _store) = memory_app(Some(10));

    let response = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let mut keys: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["service", "status", "timestamp"]);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["service"], "vision");
}

#[tokio::test]
async fn test_public_health_reports_down_without_details() {
    let (app, _store) = unreachable_app();

    let response = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "DOWN");
    assert_eq!(body.as_object().unwrap().len(), 3);
    assert!(!body.to_string().contains("Server selection"));
}

#[tokio::test]
async fn test_storage_failures_map_to_503() {
    let (app, store) = unreachable_app();

    let response = send(&app, empty_request("GET", "/ranges")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "storage_unavailable");

    let response = create(&app, "BTN open", "user-1").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = send(&app, empty_request("DELETE", "/ranges/abc")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(store.call_count(), 3);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _store) = memory_app(Some(10));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/ranges")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": \"BTN"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_failed");
}
