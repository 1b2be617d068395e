//! Failure handling of `DatabaseClient` against a mocked service.

use advisor_store::api::NewUser;
use advisor_store::DatabaseClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_success_envelope_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "data": { "user_id": "u-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatabaseClient::new(server.uri());
    let envelope = client.get_user("u-1").await;
    assert!(envelope.ok);
    assert_eq!(envelope.data.unwrap()["user_id"], "u-1");
}

#[tokio::test]
async fn test_error_envelope_survives_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profiles/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ok": false,
            "error": "Profile not found"
        })))
        .mount(&server)
        .await;

    let client = DatabaseClient::new(server.uri());
    let envelope = client.get_profile("missing").await;
    assert!(!envelope.ok);
    assert_eq!(envelope.error.as_deref(), Some("Profile not found"));
}

#[tokio::test]
async fn test_non_json_error_page_becomes_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let client = DatabaseClient::new(server.uri());
    let envelope = client.health_check().await;
    assert!(!envelope.ok);
    assert!(envelope.error.unwrap().contains("502"));
}

#[tokio::test]
async fn test_garbage_success_body_becomes_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/backup"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = DatabaseClient::new(server.uri());
    let envelope = client.create_backup().await;
    assert!(!envelope.ok);
    assert!(envelope.error.unwrap().contains("Invalid response"));
}

#[tokio::test]
async fn test_unreachable_service_becomes_error_envelope() {
    let client = DatabaseClient::new("http://127.0.0.1:1");
    let envelope = client.health_check().await;
    assert!(!envelope.ok);
    assert!(envelope.error.is_some());
    assert!(envelope.data.is_none());
}

#[tokio::test]
async fn test_query_parameters_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/p-1"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .and(query_param("days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatabaseClient::new(server.uri());
    assert!(client.get_messages("p-1", 20).await.ok);
    assert!(client.get_usage_stats(7).await.ok);
}

#[tokio::test]
async fn test_path_ids_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/a%20b/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatabaseClient::new(server.uri());
    assert!(client.get_user_profiles("a b").await.ok);
}

#[tokio::test]
async fn test_request_body_is_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_partial_json(json!({ "user_id": "u-1", "email": "amy@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "message": "User saved successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatabaseClient::new(format!("{}/", server.uri()));
    let user = NewUser {
        user_id: "u-1".into(),
        email: Some("amy@example.com".into()),
        ..Default::default()
    };
    let envelope = client.save_user(&user).await;
    assert!(envelope.ok);
    assert_eq!(envelope.message.as_deref(), Some("User saved successfully"));
}
