mod common;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::{Json, Router};
use common::{test_config, Reply, ScriptedTransport};
use rinha_dispatch::app::{Config, Pipeline};
use rinha_dispatch::error::PaymentError;
use rinha_dispatch::handlers::{self, payments::create_payment, purge::purge_payments};
use rinha_dispatch::storage::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn start(config: Config, transport: ScriptedTransport, store: &InMemoryStore) -> Pipeline {
    Pipeline::start(
        &config,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(transport),
    )
    .await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn admitted_payment_is_accepted() {
    let store = InMemoryStore::new();
    let pipeline = start(test_config(1), ScriptedTransport::healthy(), &store).await;

    let (status, Json(body)) = create_payment(
        State(pipeline.service.clone()),
        Ok(Json(json!({ "correlationId": "http-1", "amount": 19.90 }))),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["correlationId"], "http-1");
    assert_eq!(body["status"], "accepted");

    pipeline.shutdown().await.unwrap();
    assert_eq!(store.payments().len(), 1);
}

#[tokio::test]
async fn missing_correlation_id_gets_a_generated_one() {
    let store = InMemoryStore::new();
    let pipeline = start(test_config(1), ScriptedTransport::healthy(), &store).await;

    let (status, Json(body)) = create_payment(State(pipeline.service.clone()), Ok(Json(json!({ "amount": 5 }))))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["correlationId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "{id} is not a uuid");

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn full_and_closed_queue_answer_service_unavailable() {
    let store = InMemoryStore::new();
    // no workers, so the single slot stays taken
    let config = Config {
        worker_count: 0,
        queue_capacity: 1,
        ..test_config(0)
    };
    let pipeline = start(config, ScriptedTransport::healthy(), &store).await;
    let service = pipeline.service.clone();
    let body = || Ok(Json(json!({ "correlationId": "q", "amount": 1.00 })));

    let (status, _) = create_payment(State(service.clone()), body()).await.unwrap();
    assert_eq!(status, StatusCode::ACCEPTED);

    let err = create_payment(State(service.clone()), body()).await.unwrap_err();
    assert!(matches!(err, PaymentError::QueueFull));
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    pipeline.shutdown().await.unwrap();

    let err = create_payment(State(service), body()).await.unwrap_err();
    assert!(matches!(err, PaymentError::QueueClosed));
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn invalid_amounts_are_bad_requests() {
    let store = InMemoryStore::new();
    let pipeline = start(test_config(1), ScriptedTransport::healthy(), &store).await;

    for amount in [json!(0), json!(-3.5), json!(100000000000.00), json!("ten")] {
        let err = create_payment(
            State(pipeline.service.clone()),
            Ok(Json(json!({ "correlationId": "bad", "amount": amount }))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "amount {amount}");
    }

    pipeline.shutdown().await.unwrap();
    assert!(store.payments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn waiting_ingestion_reports_the_processor() {
    let store = InMemoryStore::new();
    let config = Config {
        wait_for_completion: true,
        ..test_config(1)
    };
    let pipeline = start(config, ScriptedTransport::healthy(), &store).await;

    let (status, Json(body)) = create_payment(
        State(pipeline.service.clone()),
        Ok(Json(json!({ "correlationId": "w-1", "amount": 4.20 }))),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processor"], "default");
    assert_eq!(body["status"], "processed");

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn waiting_ingestion_surfaces_exhausted_processors_as_bad_gateway() {
    let store = InMemoryStore::new();
    let config = Config {
        wait_for_completion: true,
        ..test_config(1)
    };
    let transport = ScriptedTransport::new(Reply::Status(500), Reply::Timeout);
    let pipeline = start(config, transport, &store).await;

    let err = create_payment(
        State(pipeline.service.clone()),
        Ok(Json(json!({ "correlationId": "w-2", "amount": 4.20 }))),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PaymentError::AllProcessorsUnavailable));
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

    pipeline.shutdown().await.unwrap();
    assert!(store.payments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn purge_answers_ok_then_unavailable_when_storage_keeps_failing() {
    let store = InMemoryStore::new();
    let pipeline = start(test_config(1), ScriptedTransport::healthy(), &store).await;

    let status = purge_payments(State(pipeline.service.clone())).await.unwrap();
    assert_eq!(status, StatusCode::OK);

    // one attempt plus two retries
    store.fail_next_purges(3);
    let err = purge_payments(State(pipeline.service.clone())).await.unwrap_err();
    assert!(matches!(err, PaymentError::StorageUnavailable(_)));
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn router_serves_every_endpoint() {
    let store = InMemoryStore::new();
    let pipeline = start(test_config(1), ScriptedTransport::healthy(), &store).await;
    let app = handlers::router(pipeline.service.clone());

    let (status, _) = send(&app, Request::get("/healthcheck").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_json("/payments", r#"{"correlationId":"r-1","amount":10.50}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["correlationId"], "r-1");

    let (status, body) = send(
        &app,
        Request::get("/payments-summary?from=2000-01-01T00:00:00Z&to=2100-01-01T00:00:00Z")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["default"]["totalRequests"].is_u64());
    assert!(body["fallback"]["totalAmount"].is_number());

    let (status, body) = send(&app, Request::get("/payments-summary").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queueCapacity"], 1024);

    let (status, _) = send(&app, Request::post("/purge-payments").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreadable_payment_bodies_are_bad_requests() {
    let store = InMemoryStore::new();
    let pipeline = start(test_config(1), ScriptedTransport::healthy(), &store).await;
    let app = handlers::router(pipeline.service.clone());

    let no_content_type = Request::post("/payments")
        .body(Body::from(r#"{"correlationId":"x","amount":1}"#))
        .unwrap();
    let (status, body) = send(&app, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, post_json("/payments", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/payments", r#"{"correlationId":"x"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    pipeline.shutdown().await.unwrap();
    assert!(store.payments().is_empty());
}
