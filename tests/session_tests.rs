//! Editing session tests

mod common;

use common::*;
use pretty_assertions::assert_eq;
use royalbit_sheetwriter::api::{
    EditingSession, GraphSessionProvider, HttpResponse, NoSessionProvider, RetryPolicy, SessionProvider,
};
use serde_json::json;
use std::time::Duration;

const WORKBOOK: &str = "/drives/drive1/items/file1/workbook";

#[test]
fn test_session_created_synchronously() {
    let transport = MockTransport::new();
    transport.push_json(201, json!({"id": "cluster=PS5&session=15", "persistChanges": true}));
    let executor = executor(&transport);

    let session = GraphSessionProvider::new(&executor).open("drive1", "file1");

    assert_eq!(
        session,
        Some(EditingSession::new("drive1", "file1", "cluster=PS5&session=15"))
    );
    let request = &transport.requests()[0];
    assert_eq!(transport.paths()[0], format!("{}/createSession", WORKBOOK));
    assert_eq!(request.header("Prefer"), Some("respond-async"));
    assert_eq!(body(request), json!({"persistChanges": true}));
}

#[test]
fn test_session_created_asynchronously() {
    let transport = MockTransport::new();
    transport
        .push(
            HttpResponse::new(202, "")
                .with_header("Location", "https://graph.test/v1.0/operations/op1"),
        )
        .push_json(200, json!({"id": "op1", "status": "running"}))
        .push_json(
            200,
            json!({
                "id": "op1",
                "status": "succeeded",
                "resourceLocation": "https://graph.test/v1.0/sessions/s9"
            }),
        )
        .push_json(200, json!({"id": "s9"}));
    let executor = executor(&transport);

    let session = GraphSessionProvider::new(&executor)
        .with_poll_interval(Duration::ZERO)
        .open("drive1", "file1");

    assert_eq!(session.map(|s| s.id().to_string()), Some("s9".to_string()));
    assert_eq!(
        transport.paths(),
        vec![
            format!("{}/createSession", WORKBOOK),
            "/operations/op1".to_string(),
            "/operations/op1".to_string(),
            "/sessions/s9".to_string(),
        ]
    );
}

#[test]
fn test_failed_async_creation_continues_without_session() {
    let transport = MockTransport::new();
    transport
        .push(
            HttpResponse::new(202, "")
                .with_header("Location", "https://graph.test/v1.0/operations/op1"),
        )
        .push_json(200, json!({"id": "op1", "status": "failed"}));
    let executor = executor(&transport);

    let session = GraphSessionProvider::new(&executor)
        .with_poll_interval(Duration::ZERO)
        .open("drive1", "file1");

    assert_eq!(session, None);
}

#[test]
fn test_creation_error_continues_without_session() {
    let transport = MockTransport::new();
    transport.push_api_error(403, "accessDenied", "Access denied");
    let (executor, _) = executor_with(&transport, RetryPolicy::no_retry());

    let session = GraphSessionProvider::new(&executor).open("drive1", "file1");

    assert_eq!(session, None);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn test_close_sends_session_header() {
    let transport = MockTransport::new();
    transport.push(HttpResponse::new(204, ""));
    let executor = executor(&transport);
    let session = EditingSession::new("drive1", "file1", "s1");

    GraphSessionProvider::new(&executor).close(&session);

    let request = &transport.requests()[0];
    assert_eq!(transport.paths()[0], format!("{}/closeSession", WORKBOOK));
    assert_eq!(request.header("Workbook-Session-Id"), Some("s1"));
}

#[test]
fn test_close_failure_is_swallowed() {
    let transport = MockTransport::new();
    transport.push_api_error(404, "itemNotFound", "Session not found.");
    let executor = executor(&transport);

    GraphSessionProvider::new(&executor).close(&EditingSession::new("drive1", "file1", "gone"));

    assert_eq!(transport.request_count(), 1);
}

#[test]
fn test_no_session_provider() {
    let provider = NoSessionProvider;
    assert_eq!(provider.open("drive1", "file1"), None);
    provider.close(&EditingSession::new("drive1", "file1", "s1"));
}
