use cdnmanager_cloud::api_client::KvApiClient;
use cdnmanager_cloud::config::KvConfig;
use cdnmanager_cloud::error::CloudError;
use cdnmanager_cloud::remote_store::RemoteStore;
use cdnmanager_cloud::types::*;
use cdnmanager_types::EntryId;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NS: &str = "/accounts/acc/storage/kv/namespaces/ns";
const ID_A: &str = "0b6f3a52-6c3e-4d0e-9d6a-2f1c1f7e8a01";
const ID_B: &str = "0b6f3a52-6c3e-4d0e-9d6a-2f1c1f7e8a02";

fn config(server: &MockServer) -> KvConfig {
    KvConfig {
        api_base_url: server.uri(),
        account_id: "acc".into(),
        namespace_id: "ns".into(),
        api_token: "tok".into(),
        account_email: None,
        page_size: 2,
        request_timeout_secs: 5,
        public_base_url: None,
    }
}

async fn setup(server: &MockServer) -> KvApiClient {
    KvApiClient::new(config(server))
}

fn id(raw: &str) -> EntryId {
    EntryId::parse(raw).unwrap()
}

fn metadata_json(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "external": false,
        "mimetype": "image/png",
        "location": "cdn.example.com"
    })
}

fn ok_envelope(result: serde_json::Value) -> serde_json::Value {
    json!({ "success": true, "errors": [], "messages": [], "result": result })
}

// ── Get ──────────────────────────────────────────────────────────

#[tokio::test]
async fn get_combines_value_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://cdn.example.com/a.png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/metadata/{ID_A}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(metadata_json("Logo"))))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let entry = client.get(&id(ID_A)).await.unwrap().unwrap();
    assert_eq!(entry.id.as_str(), ID_A);
    assert_eq!(entry.value, "https://cdn.example.com/a.png");
    assert_eq!(entry.metadata.name, "Logo");
    assert!(!entry.metadata.external);
}

#[tokio::test]
async fn get_missing_key_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 10009, "message": "get: 'key not found'" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    assert!(client.get(&id(ID_A)).await.unwrap().is_none());
}

#[tokio::test]
async fn get_without_metadata_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("v"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/metadata/{ID_A}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!(null))))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let err = client.get(&id(ID_A)).await.unwrap_err();
    assert!(matches!(err, CloudError::Metadata { .. }));
}

#[tokio::test]
async fn server_error_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let err = client.get(&id(ID_A)).await.unwrap_err();
    assert!(matches!(err, CloudError::Api(_)));
}

#[tokio::test]
async fn legacy_key_auth_sends_email_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .and(header("X-Auth-Email", "me@example.com"))
        .and(header("X-Auth-Key", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v"))
        .mount(&server)
        .await;

    let client = KvApiClient::new(KvConfig {
        account_email: Some("me@example.com".into()),
        ..config(&server)
    });
    assert_eq!(client.get_value(ID_A).await.unwrap().as_deref(), Some("v"));
}

// ── Put ──────────────────────────────────────────────────────────

#[tokio::test]
async fn put_sends_bulk_pair() {
    let server = MockServer::start().await;
    let metadata = metadata_json("Logo");
    Mock::given(method("PUT"))
        .and(path(format!("{NS}/bulk")))
        .and(body_json(json!([{ "key": ID_A, "value": "v", "metadata": metadata }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!({
            "successful_key_count": 1,
            "unsuccessful_keys": []
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let outcome = client
        .put(&id(ID_A), "v", &metadata.to_string())
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::ok());
}

#[tokio::test]
async fn put_rejection_reports_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{NS}/bulk")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 10014, "message": "metadata too large" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let outcome = client
        .put(&id(ID_A), "v", &metadata_json("Logo").to_string())
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.errors, vec!["10014: metadata too large".to_string()]);
    assert_eq!(outcome.reason(), "10014: metadata too large");
}

#[tokio::test]
async fn put_with_unsuccessful_key_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{NS}/bulk")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!({
            "successful_key_count": 0,
            "unsuccessful_keys": [ID_A]
        }))))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let outcome = client
        .put(&id(ID_A), "v", &metadata_json("Logo").to_string())
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.reason(), format!("keys not written: {ID_A}"));
}

#[tokio::test]
async fn put_rejects_invalid_metadata_json_locally() {
    let server = MockServer::start().await;
    let client = setup(&server).await;
    let err = client.put(&id(ID_A), "v", "not json").await.unwrap_err();
    assert!(matches!(err, CloudError::Serialization(_)));
}

// ── Delete ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_hits_values_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup(&server).await;
    client.delete(&id(ID_A)).await.unwrap();
}

#[tokio::test]
async fn delete_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 10000, "message": "Authentication error" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let err = client.delete(&id(ID_A)).await.unwrap_err();
    assert!(matches!(err, CloudError::Api(msg) if msg.contains("Authentication error")));
}

// ── List ─────────────────────────────────────────────────────────

#[tokio::test]
async fn list_pages_follow_cursor() {
    let server = MockServer::start().await;
    // Second page first: mocks are tried in mount order.
    Mock::given(method("GET"))
        .and(path(format!("{NS}/keys")))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "name": ID_B, "metadata": metadata_json("B") }],
            "result_info": { "count": 1, "cursor": "" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/keys")))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "name": ID_A, "metadata": metadata_json("A") }],
            "result_info": { "count": 1, "cursor": "c1" }
        })))
        .mount(&server)
        .await;
    for (key, value) in [(ID_A, "va"), (ID_B, "vb")] {
        Mock::given(method("GET"))
            .and(path(format!("{NS}/values/{key}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(value))
            .mount(&server)
            .await;
    }

    let client = setup(&server).await;
    let first = client.list(None).await.unwrap();
    assert_eq!(first.next_cursor.as_deref(), Some("c1"));
    assert_eq!(first.entries.len(), 1);
    assert_eq!(first.entries[0].value, "va");

    let second = client.list(Some("c1")).await.unwrap();
    assert_eq!(second.next_cursor, None);
    assert_eq!(second.entries[0].id.as_str(), ID_B);
    assert_eq!(second.entries[0].metadata.name, "B");
}

#[tokio::test]
async fn list_drops_foreign_and_vanished_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/keys")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [
                { "name": "not-an-id", "metadata": metadata_json("X") },
                { "name": ID_A, "metadata": metadata_json("A") }
            ],
            "result_info": { "cursor": "" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let page = client.list(None).await.unwrap();
    assert_eq!(page, RemotePage::default());
}

#[tokio::test]
async fn list_reports_ids_with_unusable_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/keys")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [
                { "name": ID_A, "metadata": { "metadata_name": "Logo", "metadata_external": "true" } },
                { "name": ID_B }
            ],
            "result_info": { "cursor": "" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/values/{ID_A}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://cdn.example.com/logo.png"))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    let page = client.list(None).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.unreadable, vec![id(ID_A), id(ID_B)]);
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn list_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{NS}/keys")))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = setup(&server).await;
    assert!(client.list(None).await.is_err());
}
