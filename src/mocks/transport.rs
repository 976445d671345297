//! Scripted HTTP transport.

use crate::error::{NetworkError, TerraError};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Headers.
    pub headers: HashMap<String, String>,
    /// Body.
    pub body: Bytes,
}

impl MockResponse {
    /// 200 with an empty body.
    pub fn ok() -> Self {
        Self::error(200, Bytes::new())
    }

    /// 200 with a raw body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::error(200, body)
    }

    /// 200 with `data` in a success envelope.
    pub fn envelope(data: &str) -> Self {
        Self::ok_with_body(super::TestFixtures::envelope(data))
    }

    /// 200 with a non-zero result code.
    pub fn failure(code: i64, message: &str) -> Self {
        Self::ok_with_body(super::TestFixtures::failure(code, message))
    }

    /// Any status with a raw body.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl From<MockResponse> for HttpResponse {
    fn from(mock: MockResponse) -> Self {
        HttpResponse {
            status: mock.status,
            headers: mock.headers,
            body: mock.body,
        }
    }
}

#[derive(Default)]
struct Script {
    queued: VecDeque<MockResponse>,
    recorded: Vec<HttpRequest>,
}

/// Transport that records every request and answers from a script.
///
/// Queued responses are served first, in order. After that the fallback
/// response is served, and without a fallback the send fails with a
/// retryable connection error.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    fallback: Option<MockResponse>,
}

impl MockTransport {
    /// No queued responses and no fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `responses` in order.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            script: Mutex::new(Script {
                queued: responses.into(),
                recorded: Vec::new(),
            }),
            fallback: None,
        }
    }

    /// Serve `response` for every request not covered by the queue.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// Append a response to the queue.
    pub fn queue_response(&self, response: MockResponse) {
        self.script.lock().queued.push_back(response);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().recorded.clone()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        self.script.lock().recorded.len()
    }

    /// Most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.script.lock().recorded.last().cloned()
    }

    /// Requests whose URL path ends with `suffix`, ignoring the query.
    pub fn requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
        self.script
            .lock()
            .recorded
            .iter()
            .filter(|r| r.url.split('?').next().map_or(false, |p| p.ends_with(suffix)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TerraError> {
        let next = {
            let mut script = self.script.lock();
            let url = request.url.clone();
            script.recorded.push(request);
            script
                .queued
                .pop_front()
                .or_else(|| self.fallback.clone())
                .ok_or(url)
        };

        next.map(HttpResponse::from).map_err(|url| {
            NetworkError::ConnectionFailed {
                message: format!("no scripted response for {}", url),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.script.lock();
        f.debug_struct("MockTransport")
            .field("queued", &script.queued.len())
            .field("recorded", &script.recorded.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
