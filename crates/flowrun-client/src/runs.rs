//! Flow run creation and the wait-until-terminal loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionConfig;
use crate::error::{Error, Result};
use crate::response::{self, optional_str, required_str};
use crate::transport::{HttpTransport, Method};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────────────────
// State model
// ─────────────────────────────────────────────────────────────────────────────

/// How the waiter treats a state token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// Keep polling.
    NonTerminal,
    /// `COMPLETED`.
    Success,
    /// `FAILED`, `CRASHED`, `CANCELLED`.
    Failure,
    /// `CANCELLING`: ends the wait without raising an error.
    PendingCancel,
}

/// A run state token as reported by the server (`state.type`).
///
/// Tokens are opaque apart from the terminal ones classified by
/// [`StateType::class`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StateType(String);

impl StateType {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn class(&self) -> StateClass {
        match self.0.as_str() {
            "COMPLETED" => StateClass::Success,
            "FAILED" | "CRASHED" | "CANCELLED" => StateClass::Failure,
            "CANCELLING" => StateClass::PendingCancel,
            _ => StateClass::NonTerminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.class() != StateClass::NonTerminal
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateType {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / handle / result
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs for starting a run from a deployment.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Deployment to instantiate.
    pub deployment_id: String,
    /// Flow parameters; omitted from the request when empty.
    pub parameters: Map<String, Value>,
}

impl RunRequest {
    pub fn new(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            parameters: Map::new(),
        }
    }

    /// Add or replace a single parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Replace all parameters.
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// JSON body for the create call. Always an object, possibly empty.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        if !self.parameters.is_empty() {
            body.insert(
                "parameters".to_string(),
                Value::Object(self.parameters.clone()),
            );
        }
        Value::Object(body)
    }
}

/// A triggered run and its most recently observed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    /// Server-assigned run id.
    pub id: String,
    pub state_type: StateType,
    pub state_name: Option<String>,
    pub state_message: Option<String>,
}

impl RunHandle {
    /// Read `state.type`, `state.name` and `state.message` into the handle.
    fn update_state(&mut self, body: &Value) -> Result<()> {
        self.state_type = StateType::new(required_str(body, "/state/type")?);
        self.read_state_details(body)
    }

    fn read_state_details(&mut self, body: &Value) -> Result<()> {
        self.state_name = optional_str(body, "/state/name")?.map(str::to_string);
        self.state_message = optional_str(body, "/state/message")?.map(str::to_string);
        Ok(())
    }

    /// Whether the server reported a state for this run yet.
    pub fn has_state(&self) -> bool {
        !self.state_type.as_str().is_empty()
    }

    fn into_failure(self) -> Error {
        Error::RunFailed {
            state_type: self.state_type.0,
            state_name: self.state_name,
            state_message: self.state_message,
        }
    }
}

/// Outcome returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    #[serde(rename = "flowRunId")]
    pub run_id: String,
    /// Final state when waiting, otherwise the initial one.
    #[serde(rename = "state")]
    pub state_type: StateType,
    #[serde(rename = "flowRunUrl")]
    pub view_url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sleeping
// ─────────────────────────────────────────────────────────────────────────────

/// Suspends the waiter between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trigger & waiter
// ─────────────────────────────────────────────────────────────────────────────

/// Creates flow runs and waits for them to finish.
///
/// Borrows the connection settings and a caller-owned transport; holds no
/// state shared with other triggers.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use flowrun_client::{ConnectionConfig, ReqwestTransport, RunRequest, RunTrigger};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ConnectionConfig::new("http://127.0.0.1:4200/api");
/// let transport = ReqwestTransport::new()?;
///
/// let result = RunTrigger::new(&config, &transport)
///     .run(&RunRequest::new("d1"), true, Duration::from_secs(5))
///     .await?;
/// println!("{} finished in {}", result.run_id, result.state_type);
/// # Ok(())
/// # }
/// ```
pub struct RunTrigger<'a, T: HttpTransport + ?Sized> {
    config: &'a ConnectionConfig,
    transport: &'a T,
    sleeper: Arc<dyn Sleeper>,
    cancellation: CancellationToken,
}

impl<'a, T: HttpTransport + ?Sized> RunTrigger<'a, T> {
    pub fn new(config: &'a ConnectionConfig, transport: &'a T) -> Self {
        Self {
            config,
            transport,
            sleeper: Arc::new(TokioSleeper),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the sleeper used between polls.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Abandon waiting when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Create a run, optionally wait for it, and build the result.
    pub async fn run(
        &self,
        request: &RunRequest,
        wait: bool,
        poll_interval: Duration,
    ) -> Result<RunResult> {
        let mut handle = self.trigger(request).await?;

        if !wait && !handle.has_state() {
            return Err(Error::Protocol("missing field 'state.type'".to_string()));
        }

        if wait {
            tracing::info!(
                flow_run_id = %handle.id,
                poll_interval_ms = poll_interval.as_millis() as u64,
                "Waiting for flow run to complete"
            );
            handle = self.wait_for_terminal(handle, poll_interval).await?;
            tracing::info!(
                flow_run_id = %handle.id,
                state = %handle.state_type,
                "Flow run completed"
            );
        }

        let view_url = self.config.view_url(&handle.id)?;
        Ok(RunResult {
            run_id: handle.id,
            state_type: handle.state_type,
            view_url,
        })
    }

    /// Create a run from `request.deployment_id`.
    ///
    /// Only `id` is required in the response; a missing `state.type` leaves
    /// the handle without a state (see [`RunHandle::has_state`]).
    pub async fn trigger(&self, request: &RunRequest) -> Result<RunHandle> {
        tracing::info!(
            deployment_id = %request.deployment_id,
            "Creating flow run for deployment"
        );

        let path = format!("/deployments/{}/create_flow_run", request.deployment_id);
        let body = self
            .send(Method::Post, &path, Some(request.body().to_string()))
            .await?;

        let mut handle = RunHandle {
            id: required_str(&body, "/id")?.to_string(),
            state_type: StateType::new(optional_str(&body, "/state/type")?.unwrap_or_default()),
            state_name: None,
            state_message: None,
        };
        handle.read_state_details(&body)?;

        tracing::info!(
            flow_run_id = %handle.id,
            state = %handle.state_type,
            "Created flow run"
        );
        Ok(handle)
    }

    /// Poll the run every `poll_interval` until its state is terminal.
    ///
    /// There is no overall timeout; use the cancellation token to stop
    /// waiting early.
    pub async fn wait_for_terminal(
        &self,
        mut handle: RunHandle,
        poll_interval: Duration,
    ) -> Result<RunHandle> {
        let path = format!("/flow_runs/{}", handle.id);

        loop {
            if self.cancellation.is_cancelled() {
                return Err(Error::Cancelled { run_id: handle.id });
            }

            let body = self.send(Method::Get, &path, None).await?;
            handle.update_state(&body)?;

            match handle.state_type.class() {
                StateClass::Success | StateClass::PendingCancel => return Ok(handle),
                StateClass::Failure => return Err(handle.into_failure()),
                StateClass::NonTerminal => {
                    tracing::debug!(
                        flow_run_id = %handle.id,
                        state = %handle.state_type,
                        "Flow run not finished yet"
                    );
                }
            }

            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    return Err(Error::Cancelled { run_id: handle.id });
                }
                _ = self.sleeper.sleep(poll_interval) => {}
            }
        }
    }

    /// Issue one request and interpret its response.
    async fn send(&self, method: Method, path: &str, body: Option<String>) -> Result<Value> {
        let request = self.config.build_request(path)?;
        tracing::debug!(method = method.as_str(), url = %request.url, "Sending request");

        let response = self
            .transport
            .send(method, &request, body)
            .await
            .map_err(|source| {
                let url = request.url.clone();
                // Status polls are the only GETs.
                match method {
                    Method::Get => Error::Poll { url, source },
                    Method::Post => Error::Connection { url, source },
                }
            })?;

        response::parse(&response)
    }
}
