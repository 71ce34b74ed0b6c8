//! Mock device API for testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::transport::{HttpApi, Method};

/// One request seen by [`MockApi`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

/// Scripted response for the next request.
#[derive(Clone, Debug)]
pub enum MockReply {
    Json(Value),
    TransportFailure(String),
}

/// Replays scripted replies in order and records every request.
///
/// When the script runs out, `fallback` is returned.
pub struct MockApi {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<MockReply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(MockReply::Json(serde_json::json!({ "msg": "done" }))),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `value` (unless something is queued).
    pub fn with_response(self, value: Value) -> Self {
        *lock(&self.fallback) = MockReply::Json(value);
        self
    }

    pub fn with_transport_failure(self, reason: impl Into<String>) -> Self {
        *lock(&self.fallback) = MockReply::TransportFailure(reason.into());
        self
    }

    /// Queue a reply for the next unanswered request.
    pub fn push_response(&self, value: Value) {
        lock(&self.replies).push_back(MockReply::Json(value));
    }

    pub fn push_transport_failure(&self, reason: impl Into<String>) {
        lock(&self.replies).push_back(MockReply::TransportFailure(reason.into()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpApi for MockApi {
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<Value> {
        lock(&self.requests).push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });

        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| lock(&self.fallback).clone());

        match reply {
            MockReply::Json(v) => Ok(v),
            MockReply::TransportFailure(reason) => Err(StoreError::Transport(reason)),
        }
    }
}
