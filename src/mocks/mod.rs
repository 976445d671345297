//! Mock implementations for testing.
//!
//! This module provides mock implementations of the transport, the signer
//! and object storage, plus JSON fixtures for API responses.

mod object_store;
mod signer;
mod transport;

pub use object_store::{MockObjectStore, MockObjectStoreFactory, PutRecord};
pub use signer::{MockSigner, SignCall};
pub use transport::{MockResponse, MockTransport};

use crate::config::TerraConfig;
use crate::credentials::Credential;
use crate::error::TerraError;

/// Test fixtures for API responses.
pub struct TestFixtures;

impl TestFixtures {
    /// Wrap a JSON document in a success envelope.
    pub fn envelope(data: &str) -> String {
        format!(
            r#"{{"result":{{"code":0,"msg":"","desc":""}},"data":{}}}"#,
            data
        )
    }

    /// An envelope carrying a non-zero result code.
    pub fn failure(code: i64, message: &str) -> String {
        serde_json::json!({
            "result": {"code": code, "msg": message, "desc": ""},
            "data": null,
        })
        .to_string()
    }

    /// Configuration with a fixed credential and test-friendly timings.
    pub fn config() -> Result<TerraConfig, TerraError> {
        TerraConfig::builder()
            .credential(Credential::new("test-app", "test-secret")?)
            .initial_backoff(std::time::Duration::from_millis(1))
            .max_backoff(std::time::Duration::from_millis(5))
            .poll_interval(std::time::Duration::from_millis(1))
            .build()
    }

    /// Storage token with a `{fileName}` store path.
    pub fn sts_token() -> String {
        serde_json::json!({
            "accessKeyID": "STS.test-access-key",
            "secretAccessKey": "test-secret-access-key",
            "sessionToken": "test-session-token",
            "region": "oss-cn-hangzhou",
            "cloudBucketName": "terra-upload",
            "cloudName": "alicloud",
            "expireTime": 1728981005,
            "callbackParam": "callback-param-1",
            "storePath": "uploads/res-1/{fileName}",
        })
        .to_string()
    }

    /// Resource detail listing `file_uuids`.
    pub fn resource_detail(uuid: &str, file_uuids: &[&str]) -> String {
        serde_json::json!({
            "summary": {
                "uuid": uuid,
                "name": "survey",
                "type": "map",
                "fileCount": file_uuids.len(),
            },
            "fileUuids": file_uuids,
            "inputJobUuids": [],
            "outputJobUuids": [],
        })
        .to_string()
    }

    /// File metadata.
    pub fn file(uuid: &str, name: &str, url: &str) -> String {
        serde_json::json!({
            "uuid": uuid,
            "name": name,
            "size": 3,
            "checksum": "etag-1",
            "url": url,
        })
        .to_string()
    }

    /// Job with a status ordinal.
    pub fn job(uuid: &str, status: u8) -> String {
        serde_json::json!({
            "uuid": uuid,
            "name": "reconstruction",
            "status": status,
            "type": 15,
        })
        .to_string()
    }

    /// One page of a list response.
    pub fn page(items: &[String], page: u32, rows: u32, total: u64) -> String {
        format!(
            r#"{{"list":[{}],"page":{},"rows":{},"total":{}}}"#,
            items.join(","),
            page,
            rows,
            total
        )
    }
}
