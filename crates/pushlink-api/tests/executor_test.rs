#![allow(clippy::unwrap_used)]
// Integration tests for `TransactionExecutor` and `ResourceAdapter` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pushlink_api::{
    Collection, Error, Method, Payload, Record, ResourceAdapter, STATUS_TRANSPORT_FAILURE,
    SessionCookie, TransactionExecutor, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn executor_for(base: &str) -> Arc<TransactionExecutor> {
    let config = TransportConfig::default().with_timeout(Duration::from_secs(5));
    Arc::new(TransactionExecutor::new(Url::parse(base).unwrap(), &config).unwrap())
}

async fn setup() -> (MockServer, ResourceAdapter) {
    let server = MockServer::start().await;
    let executor = executor_for(&server.uri());
    executor
        .session()
        .set(SessionCookie::new("SACSID", "cookie-value"));
    (server, ResourceAdapter::new(executor))
}

// ── Login exchange ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_captures_cookie_from_redirect() {
    let server = MockServer::start().await;
    let executor = executor_for(&server.uri());

    Mock::given(method("GET"))
        .and(path("/_ah/login"))
        .and(query_param("auth", "tok-123"))
        .and(query_param("continue", server.uri()))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", "SACSID=session-abc; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = SecretString::from("tok-123".to_owned());
    let cookie = executor.login(&token, "SACSID").await.unwrap();

    assert_eq!(cookie.header_value(), "SACSID=session-abc");
    assert!(executor.session().is_authenticated());
}

#[tokio::test]
async fn test_login_rejects_non_redirect() {
    let server = MockServer::start().await;
    let executor = executor_for(&server.uri());

    Mock::given(method("GET"))
        .and(path("/_ah/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "SACSID=session-abc; Path=/"),
        )
        .mount(&server)
        .await;

    let token = SecretString::from("tok".to_owned());
    let result = executor.login(&token, "SACSID").await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!executor.session().is_authenticated());
}

#[tokio::test]
async fn test_login_rejects_redirect_without_named_cookie() {
    let server = MockServer::start().await;
    let executor = executor_for(&server.uri());

    Mock::given(method("GET"))
        .and(path("/_ah/login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Set-Cookie", "OTHER=value; Path=/"),
        )
        .mount(&server)
        .await;

    let token = SecretString::from("tok".to_owned());
    let result = executor.login(&token, "SACSID").await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

// ── Executor behaviour ──────────────────────────────────────────────

#[tokio::test]
async fn test_execute_without_cookie_sends_nothing() {
    let server = MockServer::start().await;
    let executor = executor_for(&server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = executor.execute(Method::Get, "device/", None).await;
    assert!(matches!(result, Err(Error::MissingCredential)));
}

#[tokio::test]
async fn test_execute_attaches_cookie_and_accept() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/abc/"))
        .and(header("Cookie", "SACSID=cookie-value"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dev_id": "abc",
            "revision": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rec = adapter.read(Collection::Device, "abc").await.unwrap().unwrap();
    assert_eq!(rec.get("dev_id"), Some("abc"));
    assert_eq!(rec.get("revision"), Some("4"));
}

#[tokio::test]
async fn test_redirect_is_surfaced_not_followed() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/user/u1/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let txn = adapter
        .executor()
        .execute(Method::Get, "user/u1/", None)
        .await
        .unwrap();
    assert_eq!(txn.status_code(), 302);
    assert!(txn.response_body().is_none());
}

#[tokio::test]
async fn test_non_200_discards_body() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/publication/p1/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "nope"})))
        .mount(&server)
        .await;

    let txn = adapter
        .executor()
        .execute(Method::Get, "publication/p1/", None)
        .await
        .unwrap();
    assert_eq!(txn.status_code(), 404);
    assert!(txn.response_body().is_none());
    assert!(adapter.read(Collection::Publication, "p1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_undecodable_200_has_no_body() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/x/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let txn = adapter
        .executor()
        .execute(Method::Get, "device/x/", None)
        .await
        .unwrap();
    assert!(txn.is_ok());
    assert!(txn.response_body().is_none());
}

#[tokio::test]
async fn test_connection_failure_reports_minus_one() {
    // Nothing listens on port 1.
    let executor = executor_for("http://127.0.0.1:1");
    executor.session().set(SessionCookie::new("SACSID", "v"));

    let txn = executor.execute(Method::Delete, "device/", None).await.unwrap();
    assert_eq!(txn.status_code(), STATUS_TRANSPORT_FAILURE);
    assert!(txn.status().is_none());
}

// ── Resource adapter ────────────────────────────────────────────────

#[tokio::test]
async fn test_create_posts_string_typed_body() {
    let (server, adapter) = setup().await;

    Mock::given(method("POST"))
        .and(path("/subscription/"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"pub_id": "p1", "priority": "2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub_id": "s9",
            "pub_id": "p1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rec = Record::new().with("pub_id", "p1").with("priority", 2);
    let created = adapter
        .create(Collection::Subscription, &rec)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.get("sub_id"), Some("s9"));
}

#[tokio::test]
async fn test_read_all_returns_records() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"dev_id": "a", "name": "one"},
            {"dev_id": "b", "name": "two"}
        ])))
        .mount(&server)
        .await;

    let all = adapter.read_all(Collection::Device).await.unwrap().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].get("dev_id"), Some("b"));
}

#[tokio::test]
async fn test_read_all_rejects_object_body() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/user/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "u"})))
        .mount(&server)
        .await;

    assert!(adapter.read_all(Collection::User).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_puts_to_keyed_path() {
    let (server, adapter) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/device/d1/"))
        .and(body_json(json!({"dev_id": "d1", "name": "renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let rec = Record::new().with("dev_id", "d1").with("name", "renamed");
    adapter.update(Collection::Device, &rec).await.unwrap();
}

#[tokio::test]
async fn test_update_without_key_sends_nothing() {
    let (server, adapter) = setup().await;

    let rec = Record::new().with("name", "orphan");
    let err = adapter.update(Collection::Device, &rec).await.unwrap_err();
    assert!(matches!(err, Error::MissingKey { ref field } if field == "dev_id"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_delete_all() {
    let (server, adapter) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/publication/p1/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/publication/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(adapter.delete(Collection::Publication, "p1").await.unwrap());
    assert!(!adapter.delete_all(Collection::Publication).await.unwrap());
}

#[tokio::test]
async fn test_delete_record_uses_key_field() {
    let (server, adapter) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/subscription/s7/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let record: Record = [("sub_id", "s7"), ("pub_id", "p1")].into_iter().collect();
    assert!(
        adapter
            .delete_record(Collection::Subscription, &record)
            .await
            .unwrap()
    );

    let keyless: Record = [("pub_id", "p1")].into_iter().collect();
    let err = adapter
        .delete_record(Collection::Subscription, &keyless)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingKey { ref field } if field == "sub_id"));
}

#[tokio::test]
async fn test_message_posts_to_message_path() {
    let (server, adapter) = setup().await;

    Mock::given(method("POST"))
        .and(path("/device/d1/message/"))
        .and(body_json(json!({"dev_id": "d1", "text": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queued": true})))
        .expect(1)
        .mount(&server)
        .await;

    let rec = Record::new().with("dev_id", "d1").with("text", "hello");
    let reply = adapter.message(Collection::Device, &rec).await.unwrap().unwrap();
    assert_eq!(reply.get("queued"), Some("true"));
}

#[tokio::test]
async fn test_array_payload_for_single_read_is_none() {
    let (server, adapter) = setup().await;

    Mock::given(method("GET"))
        .and(path("/user/u1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"user_id": "u1"}])))
        .mount(&server)
        .await;

    let txn = adapter
        .executor()
        .execute(Method::Get, "user/u1/", None)
        .await
        .unwrap();
    assert!(matches!(txn.response_body(), Some(Payload::Array(_))));
    assert!(adapter.read(Collection::User, "u1").await.unwrap().is_none());
}
