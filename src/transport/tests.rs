//! Handler tests drive the router directly through `tower::ServiceExt`
//! without binding a socket.

use super::{AppState, build_router};
use crate::broker::Broker;
use crate::dataset::Dataset;
use crate::record::LogCandidate;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn setup() -> (Arc<Broker>, Router) {
    let broker = Arc::new(Broker::new());
    let state = Arc::new(AppState::new(
        Arc::clone(&broker),
        Dataset::builtin(),
        "logs",
    ));
    (broker, build_router(state, Duration::from_secs(5)))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_, router) = setup();
    let (status, body) = get(&router, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "development");
}

#[tokio::test]
async fn test_send_log_then_list() {
    let (broker, router) = setup();
    let (status, body) = post_json(
        &router,
        "/api/v1/log",
        json!({
            "service": "test-service",
            "level": "ERROR",
            "message": "Test error message",
            "metadata": { "test_id": "test-001" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["offset"], 0);
    assert_eq!(broker.topic_len("logs"), 1);

    let (status, body) = get(&router, "/api/v1/logs?service=test-service").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let log = &body["logs"][0];
    assert_eq!(log["service"], "test-service");
    assert_eq!(log["level"], "ERROR");
    assert_eq!(log["message"], "Test error message");
    assert_eq!(log["metadata"]["test_id"], "test-001");
    assert_eq!(log["topic"], "logs");
    assert!(log["timestamp"].is_string());
    assert!(log["broker_timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_send_invalid_log_is_bad_request() {
    let (broker, router) = setup();

    let (status, body) = post_json(
        &router,
        "/api/v1/log",
        json!({ "service": "auth", "level": "bogus", "message": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["detail"].as_str().unwrap().contains("bogus"));

    let (status, _) = post_json(&router, "/api/v1/log", json!({ "level": "INFO" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(broker.topic_len("logs"), 0);
}

#[tokio::test]
async fn test_list_logs_filters_and_limits() {
    let (broker, router) = setup();
    for (service, level) in [
        ("auth", "INFO"),
        ("auth", "ERROR"),
        ("billing", "warning"),
        ("auth", "ERROR"),
    ] {
        broker
            .publish("logs", LogCandidate::new(service, level, "m"))
            .unwrap();
    }

    let (_, body) = get(&router, "/api/v1/logs").await;
    assert_eq!(body["count"], 4);
    // Newest first.
    assert_eq!(body["logs"][0]["offset"], 3);

    let (_, body) = get(&router, "/api/v1/logs?limit=2").await;
    assert_eq!(body["count"], 2);

    let (_, body) = get(&router, "/api/v1/logs?service=auth&level=error").await;
    assert_eq!(body["count"], 2);

    let (_, body) = get(&router, "/api/v1/logs?level=WARNING").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["logs"][0]["level"], "WARN");

    let (status, _) = get(&router, "/api/v1/logs?level=loud").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dataset_info() {
    let (_, router) = setup();
    let (status, body) = get(&router, "/api/v1/dataset/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["total_logs"], 5);
    assert_eq!(body["sample"].as_array().unwrap().len(), 3);
    assert_eq!(body["sample"][0]["service"], "auth-service");
}

#[tokio::test]
async fn test_send_dataset_record() {
    let (broker, router) = setup();
    let (status, body) = get(&router, "/api/v1/kaggle/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offset"], 0);

    let stored = broker.read_from("logs", 0, 1).unwrap();
    assert_eq!(stored[0].service(), "payment-service");

    let (status, body) = get(&router, "/api/v1/kaggle/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(broker.topic_len("logs"), 1);
}

#[tokio::test]
async fn test_send_dataset_batch_uses_half_open_range() {
    let (broker, router) = setup();

    let (status, body) = post_json(
        &router,
        "/api/v1/kaggle/batch",
        json!({ "start_index": 1, "count": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success_count"], 3);
    let services: Vec<String> = broker
        .read_from("logs", 0, 10)
        .unwrap()
        .iter()
        .map(|r| r.service().to_string())
        .collect();
    assert_eq!(
        services,
        vec!["payment-service", "inventory-service", "notification-service"]
    );

    // Default count is 10, clipped to the end of the dataset.
    let (_, body) = post_json(&router, "/api/v1/kaggle/batch", json!({ "start_index": 3 })).await;
    assert_eq!(body["success_count"], 2);

    let (status, _) = post_json(
        &router,
        "/api/v1/kaggle/batch",
        json!({ "start_index": 0, "count": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &router,
        "/api/v1/kaggle/batch",
        json!({ "start_index": 99, "count": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_topics_and_range_reads() {
    let (broker, router) = setup();
    for i in 0..5 {
        broker
            .publish("audit", LogCandidate::new("svc", "INFO", &format!("m{i}")))
            .unwrap();
    }
    broker
        .publish("logs", LogCandidate::new("svc", "INFO", "x"))
        .unwrap();

    let (status, body) = get(&router, "/api/v1/topics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["topics"],
        json!([{ "name": "audit", "length": 5 }, { "name": "logs", "length": 1 }])
    );

    let (status, body) = get(&router, "/api/v1/topics/audit/records?offset=2&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let offsets: Vec<u64> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["offset"].as_u64().unwrap())
        .collect();
    assert_eq!(offsets, vec![2, 3, 4]);

    let (_, body) = get(&router, "/api/v1/topics/audit/records?offset=9").await;
    assert_eq!(body["count"], 0);

    let (status, body) = get(&router, "/api/v1/topics/audit/records?offset=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (_, router) = setup();
    let (status, _) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
