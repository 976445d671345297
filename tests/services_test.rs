//! Integration tests for the API services and the dispatcher.

use http::Method;
use std::sync::Arc;
use terra_api::dispatch::Dispatcher;
use terra_api::mocks::{MockResponse, MockSigner, MockTransport, TestFixtures};
use terra_api::services::{FilesService, JobsService, ResourcesService, StoreService};
use terra_api::types::*;
use terra_api::{RemoteErrorKind, TerraError};

fn create_dispatcher(transport: Arc<MockTransport>, signer: Arc<MockSigner>) -> Arc<Dispatcher> {
    let config = Arc::new(TestFixtures::config().unwrap());
    Arc::new(Dispatcher::new(config, transport, signer))
}

fn create_test_dispatcher(transport: Arc<MockTransport>) -> Arc<Dispatcher> {
    create_dispatcher(transport, Arc::new(MockSigner::new()))
}

fn body_json(request: &terra_api::HttpRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
}

#[tokio::test]
async fn test_obtain_token() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::envelope(
        &TestFixtures::sts_token(),
    )]));
    let service = StoreService::new(create_test_dispatcher(transport.clone()));

    let token = service.obtain_token().await.unwrap();
    assert_eq!(token.access_key_id, "STS.test-access-key");
    assert_eq!(token.secret_access_key(), "test-secret-access-key");
    assert_eq!(token.callback_param, "callback-param-1");

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.method, Method::POST);
    assert_eq!(
        recorded.url,
        "https://openapi-cn.dji.com/terra-rescon-be/v2/store/obtain_token"
    );
    assert!(recorded.body.is_none());
    assert!(recorded.get_header("Content-Type").is_none());
}

#[tokio::test]
async fn test_obtain_token_retries_with_fresh_signature() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::error(503, "unavailable"),
        MockResponse::error(502, "bad gateway"),
        MockResponse::envelope(&TestFixtures::sts_token()),
    ]));
    let signer = Arc::new(MockSigner::new());
    let service = StoreService::new(create_dispatcher(transport.clone(), signer.clone()));

    service.obtain_token().await.unwrap();

    assert_eq!(transport.request_count(), 3);
    let calls = signer.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.windows(2).all(|w| w[0].issued_at <= w[1].issued_at));
    assert!(calls.iter().all(|c| c.request_path == "/terra-rescon-be/v2/store/obtain_token"));
}

#[tokio::test]
async fn test_upload_callback_sent_once() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::error(503, "down")));
    let service = StoreService::new(create_test_dispatcher(transport.clone()));

    let request = UploadCallbackRequest {
        callback_param: "cb".to_string(),
        files: vec![UploadedFile {
            name: "a/DJI_0001.JPG".to_string(),
            etag: "etag-1".to_string(),
            checksum: "etag-1".to_string(),
        }],
        resource_uuid: "res-1".to_string(),
    };
    let result = service.upload_callback(&request).await;

    assert!(result.is_err());
    assert_eq!(transport.request_count(), 1);

    let recorded = transport.last_request().unwrap();
    let body = body_json(&recorded);
    assert_eq!(body["callbackParam"], "cb");
    assert_eq!(body["resourceUUID"], "res-1");
    assert_eq!(body["files"][0]["name"], "a/DJI_0001.JPG");
    assert_eq!(body["files"][0]["etag"], body["files"][0]["checksum"]);
}

#[tokio::test]
async fn test_create_resource_returns_detail() {
    let resource = r#"{"uuid":"res-1","name":"survey","type":"map"}"#;
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::envelope(resource)]));
    let service = ResourcesService::new(create_test_dispatcher(transport.clone()));

    let created = service
        .create(&CreateResourceRequest::new("survey"))
        .await
        .unwrap();
    assert_eq!(created.uuid, "res-1");
    assert_eq!(created.resource_type, ResourceType::Map);

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.get_header("Return-Detail"), Some("true"));
    assert_eq!(
        recorded.get_header("Content-Type"),
        Some("application/json;charset=UTF-8")
    );
    assert_eq!(body_json(&recorded), serde_json::json!({"name": "survey", "type": "map"}));
}

#[tokio::test]
async fn test_list_resources_query_string() {
    let page = TestFixtures::page(&[], 2, 5, 0);
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::envelope(&page)]));
    let service = ResourcesService::new(create_test_dispatcher(transport.clone()));

    let query = ResourceQuery::new().rows(5).page(2).search("farm field");
    let result = service.list(&query).await.unwrap();
    assert!(result.list.is_empty());

    let url = transport.last_request().unwrap().url;
    assert!(url.starts_with("https://openapi-cn.dji.com/terra-rescon-be/v2/resources?"));
    assert!(url.contains("rows=5"));
    assert!(url.contains("page=2"));
    assert!(url.contains("search=farm+field"));
    assert!(!url.contains("?="));
}

#[tokio::test]
async fn test_delete_resource_mode() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::envelope("{}")]));
    let service = ResourcesService::new(create_test_dispatcher(transport.clone()));

    service.delete("res-1", DeleteMode::DeleteUnlinkedFiles).await.unwrap();

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.method, Method::DELETE);
    assert!(recorded.url.ends_with("/resources/res-1?deleteMode=1"));
}

#[tokio::test]
async fn test_remote_error_code_is_mapped() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::failure(
        102114,
        "job does not exist",
    )]));
    let service = JobsService::new(create_test_dispatcher(transport.clone()));

    let err = service.get("missing").await.unwrap_err();
    assert_eq!(err.result_code(), Some(102114));
    match err {
        TerraError::Remote(remote) => {
            assert_eq!(remote.message, "job does not exist");
            assert_eq!(remote.kind, RemoteErrorKind::JobNotFound);
        }
        other => panic!("Expected remote error, got {:?}", other),
    }
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_start_job_serializes_parameters_as_string() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::envelope("{}")]));
    let service = JobsService::new(create_test_dispatcher(transport.clone()));

    let request = StartJobRequest::new(
        "res-1",
        JobType::Model3D,
        serde_json::json!({"meshing": true}),
    );
    service.start("job-1", &request).await.unwrap();

    let recorded = transport.last_request().unwrap();
    assert!(recorded.url.ends_with("/jobs/job-1/start"));
    let body = body_json(&recorded);
    assert_eq!(body["resourceUuid"], "res-1");
    assert_eq!(body["type"], 15);
    let parameters: serde_json::Value =
        serde_json::from_str(body["parameters"].as_str().unwrap()).unwrap();
    assert_eq!(parameters["parameter"]["meshing"], true);
}

#[tokio::test]
async fn test_list_jobs_uses_jobs_endpoint() {
    let page = TestFixtures::page(&[TestFixtures::job("job-1", 3)], 1, 10, 1);
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::envelope(&page)]));
    let service = JobsService::new(create_test_dispatcher(transport.clone()));

    let jobs = service
        .list(&JobQuery::new().origin_resource("res-1"))
        .await
        .unwrap();
    assert_eq!(jobs.list.len(), 1);
    assert_eq!(jobs.list[0].status, JobStatus::Executing);

    let url = transport.last_request().unwrap().url;
    assert!(url.contains("/terra-rescon-be/v2/jobs?"));
    assert!(url.contains("originResourceUuid=res-1"));
}

#[tokio::test]
async fn test_file_download_is_unsigned() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::envelope(&TestFixtures::file(
            "file-1",
            "model/mesh.obj",
            "https://bucket.example.com/mesh.obj?sig=abc",
        )),
        MockResponse::ok_with_body("obj"),
    ]));
    let signer = Arc::new(MockSigner::new());
    let service = FilesService::new(create_dispatcher(transport.clone(), signer.clone()));

    let file = service.get("file-1").await.unwrap();
    let body = service.download(&file).await.unwrap();
    assert_eq!(&body[..], b"obj");

    let requests = transport.requests();
    assert_eq!(requests[1].url, "https://bucket.example.com/mesh.obj?sig=abc");
    assert!(requests[1].get_header("Authorization").is_none());
    assert_eq!(signer.sign_count(), 1);
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok_with_body(
        "<html>gateway</html>",
    )]));
    let service = FilesService::new(create_test_dispatcher(transport));

    let err = service.get("file-1").await.unwrap_err();
    assert!(matches!(err, TerraError::Response(_)));
}

#[tokio::test]
async fn test_uuid_is_a_single_path_segment() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::envelope("{}")));
    let signer = Arc::new(MockSigner::new());
    let service = ResourcesService::new(create_dispatcher(transport.clone(), signer.clone()));

    service
        .delete("res/../jobs?x=1", DeleteMode::KeepFiles)
        .await
        .unwrap();

    let recorded = transport.last_request().unwrap();
    assert_eq!(
        recorded.url,
        "https://openapi-cn.dji.com/terra-rescon-be/v2/resources/res%2F..%2Fjobs%3Fx=1?deleteMode=0"
    );
    assert_eq!(
        signer.calls()[0].request_path,
        "/terra-rescon-be/v2/resources/res%2F..%2Fjobs%3Fx=1?deleteMode=0"
    );
}
