//! Key Vault secrets against a mock vault

mod common;

use azrest_client::keyvault::{SecretClient, SetSecretParameters};
use common::{POLL, TOKEN, credential, fast_options};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SecretClient {
    SecretClient::new(server.uri(), credential(), fast_options()).unwrap()
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {"code": "SecretNotFound", "message": "not found"}
    }))
}

#[tokio::test]
async fn test_set_and_get_secret() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/secrets/db-password"))
        .and(query_param("api-version", "7.4"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_json(json!({"value": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": "hunter2",
            "id": "https://vault/secrets/db-password/v1",
            "attributes": {"enabled": true, "created": 1700000000}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets/db-password/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": "hunter2", "id": "https://vault/secrets/db-password/v1"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let params = SetSecretParameters {
        value: "hunter2".into(),
        ..Default::default()
    };
    let set = client.set_secret("db-password", &params).await.unwrap();
    assert_eq!(set.attributes.unwrap().enabled, Some(true));

    let got = client.get_secret("db-password", Some("v1")).await.unwrap();
    assert_eq!(got.value.as_deref(), Some("hunter2"));
}

#[tokio::test]
async fn test_missing_secret_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let err = client(&server).get_secret("nope", None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.response_error().unwrap().error_code.as_deref(),
        Some("SecretNotFound")
    );
}

#[tokio::test]
async fn test_delete_poller_waits_for_deleted_secret() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/secrets/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://vault/secrets/s1/v1",
            "recoveryId": "https://vault/deletedsecrets/s1",
            "deletedDate": 1700000000
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Not visible as deleted for the first two checks.
    Mock::given(method("GET"))
        .and(path("/deletedsecrets/s1"))
        .respond_with(not_found())
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deletedsecrets/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://vault/secrets/s1/v1",
            "recoveryId": "https://vault/deletedsecrets/s1"
        })))
        .mount(&server)
        .await;

    let poller = client(&server).begin_delete_secret("s1").await.unwrap();
    assert!(!poller.done());
    let deleted = poller.poll_until_done(POLL).await.unwrap();
    assert_eq!(
        deleted.recovery_id.as_deref(),
        Some("https://vault/deletedsecrets/s1")
    );
    assert_eq!(deleted.deleted_date.unwrap().timestamp(), 1_700_000_000);

    let checks = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/deletedsecrets/s1")
        .count();
    assert_eq!(checks, 3);
}

#[tokio::test]
async fn test_recover_poller_done_when_secret_readable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deletedsecrets/s1/recover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://vault/secrets/s1/v1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://vault/secrets/s1/v1", "value": "back"
        })))
        .mount(&server)
        .await;

    let mut poller = client(&server).begin_recover_deleted_secret("s1").await.unwrap();
    assert!(poller.done());
    assert!(poller.poll().await.unwrap());
    let recovered = poller.result().unwrap();
    assert_eq!(recovered.id.as_deref(), Some("https://vault/secrets/s1/v1"));
}

#[tokio::test]
async fn test_delete_status_check_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server).begin_delete_secret("s1").await.err().unwrap();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn test_list_secret_properties_follows_next_link() {
    let server = MockServer::start().await;
    let next = format!("{}/secrets?api-version=7.4&$skiptoken=page2", server.uri());
    Mock::given(method("GET"))
        .and(path("/secrets"))
        .and(query_param("maxresults", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "https://vault/secrets/a"}],
            "nextLink": next
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "https://vault/secrets/b"}],
            "nextLink": null
        })))
        .mount(&server)
        .await;

    let items = client(&server)
        .list_secret_properties(Some(1))
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    let ids: Vec<_> = items.iter().filter_map(|i| i.id.as_deref()).collect();
    assert_eq!(ids, vec!["https://vault/secrets/a", "https://vault/secrets/b"]);
}
