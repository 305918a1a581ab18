// Integration tests for `FlowsClient` using wiremock.

#![allow(clippy::unwrap_used)]

use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flowdeck_api::{Error, FlowsClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FlowsClient) {
    let server = MockServer::start().await;
    let client = FlowsClient::with_client(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

async fn expect_post(server: &MockServer, route: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_flows_unwraps_envelope() {
    let (server, client) = setup().await;

    let body = json!({
        "data": [
            {
                "id": "a1",
                "type": "http",
                "intercepted": false,
                "request": { "method": "GET", "host": "example.com", "port": 80, "path": "/" },
                "response": { "status_code": 200, "reason": "OK", "contentLength": 12 },
                "timestamp_created": 1_700_000_000.5
            },
            { "id": "b2", "type": "tcp" }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let flows = client.list_flows().await.unwrap();

    assert_eq!(flows.len(), 2);
    assert_eq!(flows[0].id, "a1");
    assert_eq!(flows[0].response.as_ref().unwrap().content_length, Some(12));
    assert_eq!(flows[1].flow_type.as_deref(), Some("tcp"));
    assert!(flows[1].request.is_none());
}

#[tokio::test]
async fn test_list_flows_bad_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client.list_flows().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>"),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

// ── Actions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_per_flow_actions_hit_expected_routes() {
    let (server, client) = setup().await;

    expect_post(&server, "/flows/f1/accept").await;
    expect_post(&server, "/flows/f1/duplicate").await;
    expect_post(&server, "/flows/f1/replay").await;
    expect_post(&server, "/flows/f1/revert").await;
    Mock::given(method("DELETE"))
        .and(path("/flows/f1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.accept("f1").await.unwrap();
    client.duplicate("f1").await.unwrap();
    client.replay("f1").await.unwrap();
    client.revert("f1").await.unwrap();
    client.delete("f1").await.unwrap();
}

#[tokio::test]
async fn test_bulk_actions() {
    let (server, client) = setup().await;

    expect_post(&server, "/flows/accept").await;
    expect_post(&server, "/clear").await;

    client.accept_all().await.unwrap();
    client.clear().await.unwrap();
}

#[tokio::test]
async fn test_update_sends_json_body() {
    let (server, client) = setup().await;

    let patch = json!({ "marked": ":star:" });
    Mock::given(method("PUT"))
        .and(path("/flows/f1"))
        .and(body_json(&patch))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.update("f1", &patch).await.unwrap();
}

// ── Dump import / export ────────────────────────────────────────────

#[tokio::test]
async fn test_download_returns_raw_bytes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/flows/dump"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8, 1, 2, 255]))
        .mount(&server)
        .await;

    let dump = client.download().await.unwrap();
    assert_eq!(dump, Bytes::from_static(&[0, 1, 2, 255]));
}

#[tokio::test]
async fn test_upload_posts_multipart_file_field() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/flows/dump"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"file\""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.upload(Bytes::from_static(b"dumpdata")).await.unwrap();
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_flow_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/flows/missing/accept"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.accept("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/flows"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_flows().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_server_error_message_is_extracted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/clear"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "shutting down" })),
        )
        .mount(&server)
        .await;

    let err = client.clear().await.unwrap_err();
    match &err {
        Error::Api { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "shutting down");
        }
        other => panic!("expected Api, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let transport = flowdeck_api::TransportConfig {
        auth_token: Some(secrecy::SecretString::from("tok".to_string())),
        ..flowdeck_api::TransportConfig::default()
    };
    let client = FlowsClient::new(&server.uri(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/flows"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_flows().await.unwrap().is_empty());
}
