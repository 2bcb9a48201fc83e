// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP adapter against an in-process axum service speaking the same JSON and
//! SSE shapes as the real one.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Query;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use perfharness_core::transport::{BatchRequest, PingRequest, StreamRequest};
use perfharness_core::{
    CallShape, CallState, ConfigLoader, ConfigOverrides, Payload, PayloadSize, PerfHarness,
    RequestId, RequestRecord, Transport, TransportError,
};
use perfharness_transport::HttpTransport;

#[derive(Deserialize)]
struct StreamParams {
    message_count: u32,
}

async fn unary(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "request_id": body["request_id"],
        "payload": body["payload"],
        "metrics": { "processing_time_us": 7 }
    }))
}

async fn stream(
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = futures::stream::iter(0..params.message_count).map(|i| {
        Ok(Event::default().data(
            json!({
                "sequence_number": i,
                "payload": [{ "key": "key_0", "value": "value_x" }]
            })
            .to_string(),
        ))
    });
    Sse::new(events)
}

async fn client_stream(Json(body): Json<Value>) -> Json<Value> {
    let processed = body["messages"].as_array().map_or(0, Vec::len);
    Json(json!({ "messages_processed": processed }))
}

async fn ping(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "client_id": body["client_id"],
        "client_timestamp": body["send_timestamp"],
        "server_timestamp": chrono::Utc::now().timestamp_micros()
    }))
}

async fn batch(Json(body): Json<Value>) -> Json<Value> {
    let responses: Vec<Value> = body["requests"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|r| json!({ "request_id": r["request_id"], "payload": r["payload"] }))
        .collect();
    Json(json!({ "responses": responses }))
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn stub_service() -> String {
    let app = Router::new()
        .route("/unary", post(unary))
        .route("/bidirectional", post(unary))
        .route("/stream", get(stream))
        .route("/client-stream", post(client_stream))
        .route("/ping", post(ping))
        .route("/batch", post(batch));
    format!("http://{}", serve(app).await)
}

fn transport(base: &str) -> HttpTransport {
    HttpTransport::new(base, Duration::from_secs(2)).unwrap()
}

fn record(id: &str) -> RequestRecord {
    RequestRecord::new(RequestId::new(id).unwrap(), Payload::filled(16))
}

#[tokio::test]
async fn test_unary_echoes_request_id() {
    let http = transport(&stub_service().await);

    let response = http.unary(record("req-1")).await.unwrap();
    assert_eq!(response.request_id, "req-1");
    assert_eq!(response.payload_bytes, 16);
    assert_eq!(response.server_processing_us, Some(7));
}

#[tokio::test]
async fn test_server_stream_over_sse() {
    let http = transport(&stub_service().await);

    let responses: Vec<_> = http
        .server_stream(StreamRequest {
            message_count: 3,
            payload_size: PayloadSize::Small,
            interval_ms: 0,
        })
        .await
        .unwrap()
        .collect()
        .await;

    let ids: Vec<String> = responses
        .into_iter()
        .map(|r| r.unwrap().request_id)
        .collect();
    assert_eq!(ids, vec!["0", "1", "2"]);
}

#[tokio::test]
async fn test_client_stream_reports_processed_count() {
    let http = transport(&stub_service().await);
    let requests = futures::stream::iter(RequestRecord::numbered("stream", 4, &Payload::filled(8)));

    let summary = http.client_stream(requests.boxed()).await.unwrap();
    assert_eq!(summary.messages_processed, 4);
}

#[tokio::test]
async fn test_bidirectional_answers_every_message() {
    let http = transport(&stub_service().await);
    let requests = futures::stream::iter(RequestRecord::numbered("bistream", 5, &Payload::filled(8)));

    let mut ids: Vec<String> = http
        .bidirectional(requests.boxed())
        .await
        .unwrap()
        .map(|r| r.unwrap().request_id)
        .collect()
        .await;
    ids.sort();
    assert_eq!(
        ids,
        vec!["bistream-0", "bistream-1", "bistream-2", "bistream-3", "bistream-4"]
    );
}

#[tokio::test]
async fn test_ping_and_batch() {
    let http = transport(&stub_service().await);

    let pong = http.ping(PingRequest::new("client-a")).await.unwrap();
    assert_eq!(pong.client_id, "client-a");
    assert!(pong.server_timestamp.is_some());

    let batch = http
        .batch(BatchRequest {
            requests: RequestRecord::numbered("batch", 6, &Payload::filled(4)),
            parallel_process: true,
        })
        .await
        .unwrap();
    assert_eq!(batch.responses.len(), 6);
    assert_eq!(batch.responses[5].request_id, "batch-5");
}

#[tokio::test]
async fn test_missing_route_is_rejected() {
    let base = format!("http://{}", serve(Router::new()).await);
    let err = transport(&base).unary(record("req-1")).await.unwrap_err();
    assert!(matches!(err, TransportError::Rejected { code, .. } if code == "404"));
}

#[tokio::test]
async fn test_closed_port_is_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport(&format!("http://{}", addr))
        .ping(PingRequest::new("client-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::ConnectionRefused { .. }));
}

#[tokio::test]
async fn test_smoke_run_over_http() {
    let base = stub_service().await;
    let config = ConfigLoader::resolve(
        None,
        &ConfigOverrides {
            transport: Some("http".to_string()),
            address: Some(base),
            call_timeout_ms: Some(2000),
            ..ConfigOverrides::default()
        },
    )
    .unwrap();
    let transport = perfharness_transport::connect(&config.target, config.call_timeout).unwrap();
    let harness = PerfHarness::new(transport, config);

    let outcomes = harness.smoke().await;
    assert_eq!(outcomes.len(), 7);
    for outcome in &outcomes {
        assert!(outcome.succeeded(), "{} failed: {:?}", outcome.label, outcome.error);
    }
    let stream = outcomes
        .iter()
        .find(|o| o.shape == CallShape::ServerStreaming)
        .unwrap();
    assert_eq!(stream.state, CallState::Completed);
    assert_eq!(stream.messages_received, 5);
}
