//! Test doubles for the transport and sleep seams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::RequestDescriptor;
use crate::error::TransportError;
use crate::runs::Sleeper;
use crate::transport::{HttpTransport, Method, RawResponse};

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub authorization: Option<String>,
    pub body: Option<String>,
}

/// Transport that replays queued responses in order.
///
/// Once the script is exhausted, further requests fail with a transport
/// error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Ok(RawResponse::new(status, body)));
        self
    }

    /// Queue a `200` response with `{"state": {"type": <state_type>}}`.
    pub fn respond_state(self, state_type: &str) -> Self {
        self.respond(
            200,
            serde_json::json!({ "state": { "type": state_type } }).to_string(),
        )
    }

    /// Queue a transport failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, entry: Result<RawResponse, String>) {
        self.script.lock().unwrap().push_back(entry);
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests made with `method`.
    pub fn count(&self, method: Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        method: Method,
        request: &RequestDescriptor,
        body: Option<String>,
    ) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: request.url.clone(),
            authorization: request
                .headers
                .get(reqwest::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Other(message)),
            None => Err(TransportError::Other("no scripted response left".to_string())),
        }
    }
}

/// Sleeper that returns immediately and records each requested duration.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
