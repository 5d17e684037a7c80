//! Router-level API tests plus one full end-to-end round trip.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use relay_api::server::AppState;
use relay_core::TaskId;
use relay_engine::config::EngineConfig;
use relay_engine::intake::TaskService;
use relay_engine::log::AttemptLog;
use relay_engine::queue::{InMemoryQueue, TaskQueue};
use relay_engine::runtime::Engine;
use relay_engine::store::{InMemoryLogStore, InMemoryTaskStore, LogStore, TaskStore};
use relay_engine::task::TaskStatus;

struct TestApp {
    router: Router,
    task_store: Arc<InMemoryTaskStore>,
    log_store: Arc<InMemoryLogStore>,
    queue: Arc<InMemoryQueue>,
}

fn test_app() -> TestApp {
    let task_store = Arc::new(InMemoryTaskStore::new());
    let log_store = Arc::new(InMemoryLogStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let service = Arc::new(TaskService::new(
        task_store.clone(),
        log_store.clone(),
        queue.clone(),
    ));
    let state = Arc::new(AppState::new(service, 5));
    TestApp {
        router: relay_api::server::router(state),
        task_store,
        log_store,
        queue,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_request() -> Value {
    json!({
        "sourceSystem": "order-service",
        "targetUrl": "https://partner.example.com/hooks/orders",
        "body": {"orderId": 42}
    })
}

#[tokio::test]
async fn create_returns_202_with_pending_task() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v1/notifications", valid_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = body_json(response).await;
    assert_eq!(body["status"], "PENDING");
    let task_id: TaskId = body["taskId"].as_str().unwrap().parse().unwrap();

    let stored = app.task_store.find_by_task_id(task_id).await.unwrap();
    assert!(stored.is_some());
    assert_eq!(app.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn create_rejects_invalid_fields_with_a_field_map() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/v1/notifications",
            json!({
                "sourceSystem": "",
                "targetUrl": "ftp://example.com",
                "maxRetries": 0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let errors = body["errors"].as_object().unwrap();
    assert!(errors.contains_key("sourceSystem"));
    assert!(errors.contains_key("targetUrl"));
    assert!(errors.contains_key("body"));
    assert!(errors.contains_key("maxRetries"));
}

#[tokio::test]
async fn create_rejects_malformed_json() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/notifications")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn status_of_unknown_task_is_404() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/v1/notifications/{}", TaskId::generate())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A non-UUID handle is indistinguishable from an unknown task.
    let response = app
        .router
        .clone()
        .oneshot(get("/v1/notifications/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_projection_uses_camel_case_wire_fields() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v1/notifications", valid_request()))
        .await
        .unwrap();
    let created = body_json(response).await;
    let task_id = created["taskId"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/v1/notifications/{task_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["taskId"], task_id.as_str());
    assert_eq!(body["sourceSystem"], "order-service");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["retryCount"], 0);
    assert_eq!(body["maxRetries"], 5);
    assert!(body.get("completedAt").is_none());
}

#[tokio::test]
async fn logs_endpoint_returns_404_until_attempts_exist() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v1/notifications", valid_request()))
        .await
        .unwrap();
    let created = body_json(response).await;
    let task_id: TaskId = created["taskId"].as_str().unwrap().parse().unwrap();

    let uri = format!("/v1/notifications/{task_id}/logs");
    let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for (number, success) in [(1u32, false), (2, true)] {
        app.log_store
            .append(AttemptLog {
                task_id,
                attempt_number: number,
                http_status: Some(if success { 200 } else { 500 }),
                response_body: None,
                error_message: (!success).then(|| "HTTP 500: boom".to_string()),
                latency_ms: 8,
                success,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["attemptNumber"], 1);
    assert_eq!(entries[0]["success"], false);
    assert_eq!(entries[1]["attemptNumber"], 2);
    assert_eq!(entries[1]["success"], true);
}

#[tokio::test]
async fn retry_is_only_permitted_for_failed_tasks() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/v1/notifications", valid_request()))
        .await
        .unwrap();
    let created = body_json(response).await;
    let task_id: TaskId = created["taskId"].as_str().unwrap().parse().unwrap();
    let uri = format!("/v1/notifications/{task_id}/retry");

    // PENDING: rejected.
    let response = app.router.clone().oneshot(post_empty(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Force FAILED, then retry succeeds and resets the record.
    let mut task = app.task_store.find_by_task_id(task_id).await.unwrap().unwrap();
    task.status = TaskStatus::Failed;
    task.retry_count = 5;
    task.completed_at = Some(Utc::now());
    app.task_store.save(&task).await.unwrap();

    let response = app.router.clone().oneshot(post_empty(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "PENDING");

    let reset = app.task_store.find_by_task_id(task_id).await.unwrap().unwrap();
    assert_eq!(reset.retry_count, 0);
    assert!(reset.completed_at.is_none());
}

#[tokio::test]
async fn retry_of_unknown_task_is_404() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(post_empty(&format!(
            "/v1/notifications/{}/retry",
            TaskId::generate()
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_report_queue_depth_and_status_counts() {
    let app = test_app();

    for _ in 0..3 {
        app.router
            .clone()
            .oneshot(post_json("/v1/notifications", valid_request()))
            .await
            .unwrap();
    }

    let response = app.router.clone().oneshot(get("/v1/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["queueSize"], 3);
    assert_eq!(body["taskStats"]["PENDING"], 3);
    assert_eq!(body["taskStats"]["PROCESSING"], 0);
    assert_eq!(body["taskStats"]["SUCCESS"], 0);
    assert_eq!(body["taskStats"]["FAILED"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_probe_is_up() {
    let app = test_app();
    let response = app.router.clone().oneshot(get("/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "UP");
}

#[tokio::test]
async fn accepted_notification_is_delivered_end_to_end() {
    use axum::routing::post as axum_post;

    // Local mock target.
    let target_app = Router::new().route("/hook", axum_post(|| async { StatusCode::OK }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, target_app).await.unwrap();
    });

    // Full stack: API router + running engine over shared stores.
    let task_store = Arc::new(InMemoryTaskStore::new());
    let log_store = Arc::new(InMemoryLogStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let engine = Engine::start(
        EngineConfig::for_tests(),
        task_store.clone(),
        log_store.clone(),
        queue.clone(),
    )
    .unwrap();
    let service = Arc::new(TaskService::new(task_store, log_store, queue));
    let router = relay_api::server::router(Arc::new(AppState::new(service, 5)));

    let response = router
        .clone()
        .oneshot(post_json(
            "/v1/notifications",
            json!({
                "sourceSystem": "e2e-suite",
                "targetUrl": format!("http://{target_addr}/hook"),
                "body": {"probe": true}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let created = body_json(response).await;
    let task_id = created["taskId"].as_str().unwrap().to_string();

    // Poll the public status endpoint until the pipeline finishes.
    let mut final_status = String::new();
    for _ in 0..100 {
        let response = router
            .clone()
            .oneshot(get(&format!("/v1/notifications/{task_id}")))
            .await
            .unwrap();
        let body = body_json(response).await;
        final_status = body["status"].as_str().unwrap().to_string();
        if final_status == "SUCCESS" || final_status == "FAILED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(final_status, "SUCCESS");

    let response = router
        .clone()
        .oneshot(get(&format!("/v1/notifications/{task_id}/logs")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let logs = body_json(response).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);

    engine.shutdown().await;
}
