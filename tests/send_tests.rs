use std::time::Duration;

use anyhow::Result;
use fcm_client::{
    Credentials, FcmClient, FcmError, FcmMessage, NotificationPayload, Priority, Protocol,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_partial_json, header, method, path},
};

const PROJECT_ID: &str = "demo-project";

fn legacy_client(server: &MockServer) -> FcmClient {
    let mut client = FcmClient::legacy("server-key");
    client.with_endpoints(
        &format!("{}/fcm/send", server.uri()),
        &format!("{}/v1", server.uri()),
    );
    client
}

fn v1_client(server: &MockServer) -> FcmClient {
    let mut client = FcmClient::new(Credentials::bearer_token(PROJECT_ID, "access-token"));
    client.with_endpoints(
        &format!("{}/fcm/send", server.uri()),
        &format!("{}/v1/", server.uri()),
    );
    client
}

fn service_account_json(server: &MockServer) -> String {
    json!({
        "type": "service_account",
        "project_id": PROJECT_ID,
        "private_key_id": "test-key",
        "private_key": include_str!("fixtures/service_account_key.pem"),
        "client_email": "sender@demo-project.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri())
    })
    .to_string()
}

fn v1_send_path() -> String {
    format!("/v1/projects/{}/messages:send", PROJECT_ID)
}

/// Test: Legacy sends post the flat payload with the key header
#[tokio::test]
async fn test_legacy_send_success() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("authorization", "key=server-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "to": "device-token",
            "data": { "order": 42 },
            "priority": "high",
            "time_to_live": 60
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "multicast_id": 108,
            "success": 1,
            "failure": 0,
            "canonical_ids": 0,
            "results": [{ "message_id": "1:08" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = legacy_client(&server);
    assert_eq!(client.protocol(), Protocol::Legacy);

    let status = client
        .message_to("device-token", json!({ "order": 42 }))
        .set_priority(Priority::High)
        .set_time_to_live(60)
        .send()
        .await?;

    assert!(status.ok);
    assert_eq!(status.multicast_id, 108);
    assert_eq!(status.results[0]["message_id"], "1:08");
    assert_eq!(client.message(), &FcmMessage::default(), "Send should consume the message");

    Ok(())
}

/// Test: A legacy 503 captures Retry-After and is retryable
#[tokio::test]
async fn test_legacy_unavailable_with_retry_after() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "30"))
        .expect(1)
        .mount(&server)
        .await;

    let status = legacy_client(&server)
        .message_to("device-token", json!({}))
        .send()
        .await?;

    assert!(!status.ok);
    assert_eq!(status.status_code, 503);
    assert!(status.is_retryable());
    assert_eq!(status.retry_after_duration()?, Duration::from_secs(30));

    Ok(())
}

/// Test: v1 sends post the nested payload with the bearer header
#[tokio::test]
async fn test_v1_send_success() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(v1_send_path()))
        .and(header("authorization", "Bearer access-token"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "message": {
                "token": "device-token",
                "notification": { "title": "Hello", "body": "World" },
                "data": { "score": "7" },
                "android": { "ttl": "120s" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo-project/messages/0:1500415314455276%31bd1c9631bd1c96"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = v1_client(&server);
    assert_eq!(client.protocol(), Protocol::V1);

    let status = client
        .message_to("device-token", json!({ "score": 7 }))
        .set_notification_payload(NotificationPayload::new("Hello", "World"))
        .set_time_to_live(120)
        .send()
        .await?;

    assert!(status.ok);
    assert_eq!(status.status_code, 200);
    assert_eq!(
        status.message_id.as_deref(),
        Some("projects/demo-project/messages/0:1500415314455276%31bd1c9631bd1c96")
    );

    Ok(())
}

/// Test: A v1 error response is reported through the status, not as an error
#[tokio::test]
async fn test_v1_send_not_found() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(v1_send_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{ "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError", "errorCode": "UNREGISTERED" }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = v1_client(&server)
        .message_to("stale-token", json!({}))
        .send()
        .await?;

    assert!(!status.ok);
    assert_eq!(status.status_code, 200);
    assert_eq!(status.results[0]["error"], "NOT_FOUND");
    assert_eq!(status.error_code.as_deref(), Some("UNREGISTERED"));
    assert!(!status.is_retryable());

    Ok(())
}

/// Test: v1 topic sends target the topic field
#[tokio::test]
async fn test_v1_topic_send() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(v1_send_path()))
        .and(body_partial_json(json!({ "message": { "topic": "news" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo-project/messages/99"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = v1_client(&server)
        .message_to("/topics/news", json!({ "headline": "Launch" }))
        .send()
        .await?;

    assert!(status.ok);

    Ok(())
}

/// Test: v1 multicast fails before any request is made
#[tokio::test]
async fn test_v1_multicast_is_rejected_locally() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = v1_client(&server)
        .registration_ids_message(&["a".to_string(), "b".to_string()], json!({}))
        .send()
        .await;

    assert!(matches!(result, Err(FcmError::UnsupportedTarget(_))));

    Ok(())
}

/// Test: A connection failure surfaces as a transport error
#[tokio::test]
async fn test_transport_failure() {
    let mut client = FcmClient::legacy("server-key");
    client.with_endpoints("http://127.0.0.1:1/fcm/send", "http://127.0.0.1:1/v1");

    let result = client.message_to("device-token", json!({})).send().await;

    assert!(matches!(result, Err(FcmError::Transport(_))));
}

/// Test: Malformed service account JSON is an auth error
#[test]
fn test_malformed_service_account() {
    let result = FcmClient::v1("{ not json");

    assert!(matches!(result, Err(FcmError::Auth(_))));
}

/// Test: A service account without a project id is a config error
#[test]
fn test_service_account_without_project_id() {
    let json = json!({
        "type": "service_account",
        "client_email": "sender@example.iam.gserviceaccount.com",
        "token_uri": "https://oauth2.googleapis.com/token"
    })
    .to_string();

    let result = Credentials::service_account_json(&json);

    assert!(matches!(result, Err(FcmError::Config(_))));
}

/// Test: A non-string project id is a config error
#[test]
fn test_service_account_with_numeric_project_id() {
    let json = json!({
        "type": "service_account",
        "project_id": 123,
        "client_email": "sender@example.iam.gserviceaccount.com",
        "token_uri": "https://oauth2.googleapis.com/token"
    })
    .to_string();

    let result = Credentials::service_account_json(&json);

    assert!(matches!(result, Err(FcmError::Config(_))));
}

/// Test: A service account mints a token and sends it as a bearer header
#[tokio::test]
async fn test_service_account_send_uses_minted_token() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "minted-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(v1_send_path()))
        .and(header("authorization", "Bearer minted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo-project/messages/7"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = FcmClient::v1(&service_account_json(&server))?;
    client.with_endpoints(
        &format!("{}/fcm/send", server.uri()),
        &format!("{}/v1", server.uri()),
    );
    assert_eq!(client.protocol(), Protocol::V1);

    let status = client
        .message_to("device-token", json!({ "order": 42 }))
        .send()
        .await?;

    assert!(status.ok);
    assert_eq!(status.message_id.as_deref(), Some("projects/demo-project/messages/7"));

    Ok(())
}

/// Test: A rejected token request fails the send before anything is posted
#[tokio::test]
async fn test_service_account_token_rejected() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid JWT Signature."
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(v1_send_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = FcmClient::v1(&service_account_json(&server))?;
    client.with_endpoints(
        &format!("{}/fcm/send", server.uri()),
        &format!("{}/v1", server.uri()),
    );

    let result = client.message_to("device-token", json!({})).send().await;

    assert!(matches!(result, Err(FcmError::Auth(_))));

    Ok(())
}

/// Test: Independent clients can send concurrently
#[tokio::test]
async fn test_concurrent_independent_clients() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "multicast_id": 1,
            "success": 1,
            "failure": 0,
            "canonical_ids": 0,
            "results": [{ "message_id": "1:01" }]
        })))
        .expect(5)
        .mount(&server)
        .await;

    let sends = (0..5).map(|i| {
        let mut client = legacy_client(&server);
        async move {
            client
                .message_to(format!("device-{}", i), json!({ "n": i }))
                .send()
                .await
        }
    });

    let results = futures_util::future::join_all(sends).await;

    for result in results {
        assert!(result?.ok);
    }

    Ok(())
}
