//! Integration tests for request signing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{TimeZone, Utc};
use http::Method;
use std::sync::Arc;
use terra_api::dispatch::Dispatcher;
use terra_api::mocks::TestFixtures;
use terra_api::request::{Payload, RequestBuilder};
use terra_api::services::ResourcesService;
use terra_api::signing::{
    build_authorization, build_signing_string, content_digest, hmac_sha256, HmacSigner,
};
use terra_api::transport::ReqwestTransport;
use terra_api::{Credential, TerraConfig};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_builder() -> RequestBuilder {
    let credential = Credential::new("test-app", "test-secret").unwrap();
    RequestBuilder::new(Arc::new(HmacSigner::new(credential)))
}

#[test]
fn test_signed_post_headers() {
    let builder = create_test_builder();
    let issued_at = Utc.with_ymd_and_hms(2024, 10, 15, 8, 30, 5).unwrap();
    let payload = Payload::Text(r#"{"name":"survey","type":"map"}"#.to_string());

    let signed = builder
        .build_at(
            Method::POST,
            "https://openapi-cn.dji.com/terra-rescon-be/v2/resources",
            &payload,
            issued_at,
        )
        .unwrap();
    let request = signed.into_http_request();

    assert_eq!(request.get_header("Date"), Some("Tue, 15 Oct 2024 08:30:05 GMT"));
    assert_eq!(
        request.get_header("Digest"),
        Some("SHA-256=iM1ImxX1LhGoth4ZrFGTB+jx/BES6G3mdW6/SLt5rXs=")
    );
    assert!(request
        .get_header("Authorization")
        .unwrap()
        .ends_with("signature=\"3frhZQR/w6VRwAm92aO4B5JEa+pGeTGd62/UOGxlh4c=\""));
    assert_eq!(
        request.get_header("Content-Type"),
        Some("application/json;charset=UTF-8")
    );
}

#[test]
fn test_signed_get_has_no_content_type() {
    let builder = create_test_builder();
    let issued_at = Utc.with_ymd_and_hms(2024, 10, 15, 8, 30, 5).unwrap();

    let signed = builder
        .build_at(
            Method::GET,
            "https://openapi-cn.dji.com/terra-rescon-be/v2/resources?rows=10&page=1",
            &Payload::Empty,
            issued_at,
        )
        .unwrap();

    assert_eq!(signed.target, "/terra-rescon-be/v2/resources?rows=10&page=1");
    let request = signed.into_http_request();
    assert!(request.get_header("Content-Type").is_none());
    assert!(request
        .get_header("Authorization")
        .unwrap()
        .ends_with("signature=\"nAvIXaL7vp4ZRnwZvlmK2V/BgGV6wBkFwN2L+OCKiDk=\""));
}

#[test]
fn test_digest_covers_transmitted_bytes() {
    let builder = create_test_builder();
    let payload = Payload::json(&serde_json::json!({"name": "survey", "type": "map"})).unwrap();

    let signed = builder
        .build(
            Method::POST,
            "https://openapi-cn.dji.com/terra-rescon-be/v2/resources",
            &payload,
        )
        .unwrap();

    assert_eq!(
        signed.signature.digest,
        format!("SHA-256={}", content_digest(&signed.body))
    );
}

#[tokio::test]
async fn test_signature_verifies_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/terra-rescon-be/v2/resources/res-1"))
        .and(header_exists("date"))
        .and(header_exists("authorization"))
        .and(header("digest", "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="))
        .respond_with(ResponseTemplate::new(200).set_body_string(TestFixtures::envelope(
            &TestFixtures::resource_detail("res-1", &["file-1"]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = TerraConfig::builder()
        .credential(Credential::new("test-app", "test-secret").unwrap())
        .api_host(server.uri())
        .build()
        .unwrap();
    let credential = config.credential.clone();
    let dispatcher = Dispatcher::new(
        Arc::new(config),
        Arc::new(ReqwestTransport::new().unwrap()),
        Arc::new(HmacSigner::new(credential)),
    );
    let resources = ResourcesService::new(Arc::new(dispatcher));

    let detail = resources.get("res-1").await.unwrap();
    assert_eq!(detail.file_uuids, vec!["file-1".to_string()]);

    let received = server.received_requests().await.unwrap();
    let request = &received[0];
    let date = request.headers.get("date").unwrap().to_str().unwrap();
    let authorization = request.headers.get("authorization").unwrap().to_str().unwrap();

    let signing_string = build_signing_string(
        date,
        "GET",
        "/terra-rescon-be/v2/resources/res-1",
        &content_digest(b""),
    );
    let signature = STANDARD.encode(hmac_sha256(b"test-secret", signing_string.as_bytes()));
    assert_eq!(authorization, build_authorization("test-app", &signature));
    assert!(request.headers.get("content-type").is_none());
}
