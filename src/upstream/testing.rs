//! Scripted [`Transport`] for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use super::{FetchError, FetchRequest, Transport, UpstreamResponse};

/// A request as seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub url: String,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

/// Replays queued outcomes in order and records every request.
///
/// Once the queue is empty it falls back to `fallback`, or to a network
/// error if none was set.
#[derive(Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Result<UpstreamResponse, FetchError>>>,
    fallback: Option<Result<UpstreamResponse, FetchError>>,
    calls: Mutex<Vec<RecordedCall>>,
}

pub(crate) fn json_response(body: &str) -> UpstreamResponse {
    UpstreamResponse {
        status: 200,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: body.as_bytes().to_vec(),
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_json(self, body: &str) -> Self {
        self.script.lock().push_back(Ok(json_response(body)));
        self
    }

    pub fn then_timeout(self) -> Self {
        self.then_error(FetchError::Timeout("timeout exceeded".to_string()))
    }

    pub fn then_error(self, err: FetchError) -> Self {
        self.script.lock().push_back(Err(err));
        self
    }

    pub fn always_timeout(mut self) -> Self {
        self.fallback = Some(Err(FetchError::Timeout("timeout exceeded".to_string())));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.calls.lock().iter().map(|c| c.timeout).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: FetchRequest<'_>) -> Result<UpstreamResponse, FetchError> {
        self.calls.lock().push(RecordedCall {
            url: request.url.to_string(),
            timeout: request.timeout,
            user_agent: request.user_agent.map(str::to_string),
        });

        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }

        self.fallback
            .clone()
            .unwrap_or_else(|| Err(FetchError::Network("no scripted response".to_string())))
    }
}
