//! Client for triggering Prefect deployment runs.
//!
//! Creates a flow run from a deployment over the Prefect REST API and can
//! block until the run reaches a terminal state, turning remote failures
//! (`FAILED`, `CRASHED`, `CANCELLED`) into local errors.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use flowrun_client::{ConnectionConfig, ReqwestTransport, RunRequest, RunTrigger};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Prefect Cloud: account + workspace select cloud mode and bearer auth
//! let config = ConnectionConfig::cloud("account-uuid", "workspace-uuid", "pnu_...");
//! let transport = ReqwestTransport::new()?;
//!
//! let request = RunRequest::new("deployment-uuid").with_parameter("region", "us-east-1");
//! let result = RunTrigger::new(&config, &transport)
//!     .run(&request, true, Duration::from_secs(10))
//!     .await?;
//!
//! println!("{} -> {} ({})", result.run_id, result.state_type, result.view_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`connection`]: URL and auth header construction for cloud and self-hosted servers
//! - [`response`]: status classification and JSON field access
//! - [`transport`]: the HTTP seam and its reqwest implementation
//! - [`runs`]: create-and-await orchestration

pub mod connection;
pub mod error;
pub mod response;
pub mod runs;
pub mod testing;
pub mod transport;

pub use connection::{ConnectionConfig, DEFAULT_API_URL, Mode, RequestDescriptor};
pub use error::{Error, Result, TransportError};
pub use runs::{
    DEFAULT_POLL_INTERVAL, RunHandle, RunRequest, RunResult, RunTrigger, Sleeper, StateClass,
    StateType, TokioSleeper,
};
pub use transport::{HttpTransport, Method, RawResponse, ReqwestTransport};

// Re-exported so callers can build cancellation tokens without a direct dependency.
pub use tokio_util::sync::CancellationToken;
