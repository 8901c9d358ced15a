use std::time::Duration;

use chrono::NaiveDate;
use httpmock::prelude::*;

use inspector_types::{GatewayAccess, MdrQuery, ProviderError, ProxySettings, SmsGateway};
use premiumy::{PremiumyClient, PremiumyConfig};

fn client_for(server: &MockServer) -> PremiumyClient {
    PremiumyClient::new(PremiumyConfig {
        api_url: server.url("/v1.0/csv"),
        probe_url: server.url("/ip"),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn query() -> MdrQuery {
    MdrQuery {
        start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        sender_id: Some("Telegram".into()),
        phone: None,
        page: 1,
        per_page: 100,
    }
}

fn access() -> GatewayAccess {
    GatewayAccess {
        api_key: "secret-key".into(),
        proxy: None,
    }
}

#[tokio::test]
async fn test_fetch_sends_rpc_request_and_parses_csv() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1.0/csv")
            .header("Api-Key", "secret-key")
            .json_body_partial(
                r#"{
                    "jsonrpc": "2.0",
                    "method": "sms.mdr_full:get_list",
                    "params": {
                        "filter": {
                            "start_date": "2024-05-01 00:00:00",
                            "end_date": "2024-05-01 23:59:59",
                            "senderid": "Telegram"
                        },
                        "page": 1,
                        "per_page": 100
                    }
                }"#,
            );
        then.status(200).body(
            "datetime;senderid;b-number;message\n\
             2024-05-01 09:00:00;Telegram;447700900001;Telegram code 11111\n\
             2024-05-01 09:05:00;Telegram;447700900002;Telegram code 22222\n",
        );
    });

    let records = client_for(&server)
        .fetch_records(&query(), &access())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].phone, "447700900002");
    assert_eq!(records[1].message, "Telegram code 22222");
}

#[tokio::test]
async fn test_fetch_surfaces_api_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1.0/csv");
        then.status(200).json_body(serde_json::json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {"code": 403, "message": "Access denied"}
        }));
    });

    let err = client_for(&server)
        .fetch_records(&query(), &access())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "API returned an error: Access denied");
}

#[tokio::test]
async fn test_fetch_non_success_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1.0/csv");
        then.status(401).body("bad key");
    });

    let err = client_for(&server)
        .fetch_records(&query(), &access())
        .await
        .unwrap_err();

    match err {
        ProviderError::Status { status, reason, body } => {
            assert_eq!(status, 401);
            assert_eq!(reason, "Unauthorized");
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_missing_columns() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1.0/csv");
        then.status(200).body("senderid;phone\nTelegram;1\n");
    });

    let err = client_for(&server)
        .fetch_records(&query(), &access())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::MissingColumns));
}

#[tokio::test]
async fn test_check_proxy_reports_unreachable_proxy() {
    let server = MockServer::start();
    let proxy = ProxySettings {
        ip: "127.0.0.1".into(),
        port: 1,
        username: "user".into(),
        password: "pass".into(),
    };

    let err = client_for(&server).check_proxy(&proxy).await.unwrap_err();

    assert!(matches!(err, ProviderError::Proxy(_)));
}
