// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! HTTP transport integration tests
//!
//! Runs the client and the reporter against a local axum server that
//! answers `/write` with a fixed status.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use metrics_influxdb::transport::{HttpClient, Transport};
use metrics_influxdb::{
    Consistency, Counter, FlushMode, Precision, Reporter, ReporterConfig, TransportError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One captured request: query parameters and body.
type Captured = (HashMap<String, String>, String);

#[derive(Clone)]
struct MockInflux {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    requests: Arc<Mutex<Vec<Captured>>>,
}

async fn write(
    State(server): State<MockInflux>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> (StatusCode, &'static str) {
    server.requests.lock().push((query, body));
    if !server.delay.is_zero() {
        tokio::time::sleep(server.delay).await;
    }
    (server.status, server.body)
}

/// Start the mock server and return its port and request log.
async fn serve(
    status: StatusCode,
    body: &'static str,
    delay: Duration,
) -> (u16, Arc<Mutex<Vec<Captured>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockInflux {
        status,
        body,
        delay,
        requests: Arc::clone(&requests),
    };
    let app = Router::new().route("/write", post(write)).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (port, requests)
}

fn config(port: u16) -> ReporterConfig {
    ReporterConfig {
        port: Some(port),
        ..ReporterConfig::http("127.0.0.1", "metrics")
    }
}

async fn send_one(status: StatusCode, body: &'static str) -> Result<(), TransportError> {
    let (port, _) = serve(status, body, Duration::ZERO).await;
    let client = HttpClient::new(&config(port)).unwrap();
    client.send("m count=1i".to_string()).await
}

#[tokio::test]
async fn test_no_content_is_success() {
    let (port, requests) = serve(StatusCode::NO_CONTENT, "", Duration::ZERO).await;
    let client = HttpClient::new(&ReporterConfig {
        username: Some("writer".into()),
        precision: Some(Precision::Milliseconds),
        consistency: Some(Consistency::Quorum),
        ..config(port)
    })
    .unwrap();

    let outcomes = client
        .write_batches(vec![
            vec!["a count=1i".to_string(), "b count=2i".to_string()],
            vec!["c count=3i".to_string()],
        ])
        .await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(Result::is_ok));

    let requests = requests.lock();
    assert_eq!(requests.len(), 2);
    let (query, body) = &requests[0];
    assert_eq!(body, "a count=1i\nb count=2i");
    assert_eq!(query.get("db").map(String::as_str), Some("metrics"));
    assert_eq!(query.get("u").map(String::as_str), Some("writer"));
    assert_eq!(query.get("precision").map(String::as_str), Some("ms"));
    assert_eq!(query.get("consistency").map(String::as_str), Some("quorum"));
    assert!(!query.contains_key("p"));
    assert_eq!(requests[1].1, "c count=3i");
}

#[tokio::test]
async fn test_ok_with_body_is_server_error() {
    match send_one(StatusCode::OK, "partial write: field type conflict").await {
        Err(TransportError::Server { body }) => {
            assert_eq!(body, "partial write: field type conflict");
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_request_carries_payload() {
    match send_one(StatusCode::BAD_REQUEST, "").await {
        Err(TransportError::Syntax { payload }) => assert_eq!(payload, "m count=1i"),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized() {
    assert!(matches!(
        send_one(StatusCode::UNAUTHORIZED, "").await,
        Err(TransportError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_other_status_is_unknown() {
    assert!(matches!(
        send_one(StatusCode::SERVICE_UNAVAILABLE, "").await,
        Err(TransportError::UnknownStatus(503))
    ));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let (port, _) = serve(StatusCode::NO_CONTENT, "", Duration::from_secs(2)).await;
    let client = HttpClient::new(&ReporterConfig {
        http_timeout_ms: 100,
        ..config(port)
    })
    .unwrap();

    let result = client.send("m count=1i".to_string()).await;
    assert!(matches!(result, Err(TransportError::Timeout)), "got {:?}", result);
}

#[tokio::test]
async fn test_reporter_over_http() {
    let (port, requests) = serve(StatusCode::NO_CONTENT, "", Duration::ZERO).await;
    let reporter = Reporter::new(ReporterConfig {
        precision: Some(Precision::Seconds),
        ..config(port)
    })
    .unwrap();
    let counter = Arc::new(Counter::new());
    counter.inc_by(4);
    reporter.add_metric("jobs.done", counter);

    reporter.report(FlushMode::Immediate).wait().await;

    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    let (query, body) = &requests[0];
    assert_eq!(query.get("precision").map(String::as_str), Some("s"));
    let timestamp: i64 = body
        .strip_prefix("jobs.done count=4i ")
        .expect("counter line")
        .parse()
        .unwrap();
    assert!(timestamp > 1_600_000_000 && timestamp < 10_000_000_000);
}

#[tokio::test]
async fn test_reporter_failures_go_to_handler() {
    let (port, _) = serve(StatusCode::UNAUTHORIZED, "", Duration::ZERO).await;
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    let reporter = Reporter::builder(config(port))
        .on_transport_error(move |e| seen.lock().push(e.to_string()))
        .build()
        .unwrap();
    reporter.add_metric("x", Arc::new(Counter::new()));

    reporter.report(FlushMode::Immediate).wait().await;

    assert_eq!(*errors.lock(), vec!["unauthorized user".to_string()]);
    assert_eq!(reporter.pending_len(), 0);
}
