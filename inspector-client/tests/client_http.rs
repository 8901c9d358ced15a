//! Client behaviour against a mocked API server.

use httpmock::prelude::*;
use inspector_client::{ClientError, InspectorClient};
use inspector_types::{SmsSearchRequest, UserStatus};
use serde_json::json;

fn profile(email: &str) -> serde_json::Value {
    json!({
        "id": "7f0c1f5e-1b0a-4a49-9a3c-3f1d3c2b9a10",
        "email": email,
        "name": "Alice",
        "status": "active",
        "isAdmin": false,
        "canAddNumbers": false
    })
}

#[tokio::test]
async fn test_login_keeps_token_for_later_calls() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/api/auth/login")
            .json_body_partial(r#"{"email": "alice@example.com"}"#);
        then.status(200)
            .header("Set-Cookie", "token=jwt-123; Path=/; Max-Age=86400; HttpOnly; SameSite=Strict")
            .json_body(profile("alice@example.com"));
    });
    let me = server.mock(|when, then| {
        when.method(GET)
            .path("/api/auth/me")
            .header("Authorization", "Bearer jwt-123");
        then.status(200).json_body(profile("alice@example.com"));
    });

    let mut client = InspectorClient::new(server.base_url());
    let user = client.login("alice@example.com", "correct-horse").await.unwrap();

    assert_eq!(user.email, "alice@example.com");
    assert_eq!(client.token(), Some("jwt-123"));

    let again = client.me().await.unwrap();
    assert_eq!(again.id, user.id);

    login.assert();
    me.assert();
}

#[tokio::test]
async fn test_api_error_carries_server_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/auth/login");
        then.status(401)
            .json_body(json!({"error": "Invalid email or password.", "code": 401}));
    });

    let mut client = InspectorClient::new(server.base_url());
    let err = client.login("alice@example.com", "wrong").await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.token().is_none());
}

#[tokio::test]
async fn test_admin_session_cookie_is_replayed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/admin/login")
            .json_body(json!({"username": "admin", "password": "panel-pass"}));
        then.status(200)
            .header(
                "Set-Cookie",
                "admin_session=1700000000.abcdef; Path=/api/admin; Max-Age=3600; HttpOnly",
            )
            .json_body(json!({"success": true}));
    });
    let users = server.mock(|when, then| {
        when.method(GET)
            .path("/api/admin/users")
            .header("Authorization", "Bearer jwt-admin")
            .header("Cookie", "admin_session=1700000000.abcdef");
        then.status(200)
            .json_body(json!({"users": [profile("bob@example.com")]}));
    });

    let mut client = InspectorClient::new(server.base_url()).with_token("jwt-admin");
    client.admin_login("admin", "panel-pass").await.unwrap();
    let list = client.list_users().await.unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, UserStatus::Active);
    users.assert();
}

#[tokio::test]
async fn test_search_sends_camel_case_filter() {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method(POST).path("/api/sms/search").json_body(json!({
            "startDate": "2024-05-01",
            "endDate": "2024-05-02",
            "senderId": "Telegram"
        }));
        then.status(200)
            .json_body(json!({"total": 0, "records": [], "groups": []}));
    });

    let client = InspectorClient::new(server.base_url()).with_token("jwt");
    let req = SmsSearchRequest {
        start_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        end_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        sender_id: Some("Telegram".into()),
        phone: None,
        page: None,
        per_page: None,
    };
    let result = client.search_sms(&req).await.unwrap();

    assert_eq!(result.total, 0);
    search.assert();
}

#[tokio::test]
async fn test_numbers_round_trip() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/numbers")
            .json_body(json!({"numbers": ["111", "222"]}));
        then.status(200)
            .json_body(json!({"numbers": ["000", "111", "222"]}));
    });

    let client = InspectorClient::new(server.base_url()).with_token("jwt");
    let numbers = client
        .add_numbers(vec!["111".into(), "222".into()])
        .await
        .unwrap();

    assert_eq!(numbers, vec!["000", "111", "222"]);
}
