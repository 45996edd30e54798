//! Scripted transport for exercising the mapper without a network.
//!
//! This is a test helper. It is public so downstream crates and this
//! crate's integration tests can drive a [`Connection`](crate::Connection)
//! offline; production code should use [`ReqwestTransport`](super::ReqwestTransport).

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{OrmError, Result};

use super::{HttpRequest, HttpResponse, Transport};

/// Test helper: replays queued responses in order and records every
/// request it receives. Once the queue is empty every call fails.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body.
    pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(HttpResponse::new(status, body.to_string()))
    }

    pub fn push(&self, response: HttpResponse) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response));
        }
        self
    }

    /// Queue a network-level failure.
    pub fn push_error(&self, message: &str) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(OrmError::http(message)));
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.responses
            .lock()
            .map_err(|e| OrmError::http(format!("mock transport poisoned: {}", e)))?
            .pop_front()
            .unwrap_or_else(|| {
                Err(OrmError::http(format!(
                    "no scripted response for {} {}",
                    request.method, request.path
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_in_order_then_fails() {
        let mock = MockTransport::new();
        mock.push_json(200, serde_json::json!({"n": 1}))
            .push_error("reset by peer");

        assert_eq!(mock.send(HttpRequest::get("a")).unwrap().status, 200);
        assert!(mock.send(HttpRequest::get("b")).is_err());
        let err = mock.send(HttpRequest::get("c")).unwrap_err();
        assert!(err.to_string().contains("no scripted response for GET c"));

        let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
        assert_eq!(mock.remaining(), 0);
    }
}
