//! Client error types.

use thiserror::Error;

/// Client error type.
///
/// Every variant is fatal for the invocation that produced it; nothing is
/// retried locally.
#[derive(Debug, Error)]
pub enum Error {
    /// Required connection setting missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote API could not be reached.
    #[error(
        "Failed to connect to Prefect API at {url}. Please verify the Prefect server is running and accessible. Error: {source}"
    )]
    Connection {
        /// Target URL of the failed request.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A status poll could not reach the remote API.
    #[error(
        "Failed to poll flow run status from Prefect API at {url}. Please verify the Prefect server is running and accessible. Error: {source}"
    )]
    Poll {
        /// Target URL of the failed poll.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// Server returned an error response.
    #[error("Prefect API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Detail extracted from the body, or the raw body.
        message: String,
    },

    /// Response body was not valid JSON.
    #[error("Failed to decode Prefect API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Well-formed response missing an expected field.
    #[error("Unexpected Prefect API response: {0}")]
    Protocol(String),

    /// The flow run reached a terminal failure state.
    #[error("{}", run_failed_message(state_type, state_name.as_deref(), state_message.as_deref()))]
    RunFailed {
        /// Terminal state token, e.g. `FAILED`.
        state_type: String,
        /// Human-readable state name.
        state_name: Option<String>,
        /// Human-readable state detail.
        state_message: Option<String>,
    },

    /// Waiting was abandoned through the cancellation token.
    #[error("Stopped waiting for flow run {run_id}: cancelled")]
    Cancelled {
        /// The run that was being awaited.
        run_id: String,
    },
}

impl Error {
    /// Check if the remote run itself failed.
    pub fn is_run_failure(&self) -> bool {
        matches!(self, Error::RunFailed { .. })
    }

    /// HTTP status carried by an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a 4xx API error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a 5xx API error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

fn run_failed_message(
    state_type: &str,
    state_name: Option<&str>,
    state_message: Option<&str>,
) -> String {
    let mut message = format!("Flow run ended in state: {}", state_type);
    if let Some(name) = state_name {
        message.push_str(&format!(" ({})", name));
    }
    if let Some(detail) = state_message {
        message.push_str(&format!(" - {}", detail));
    }
    message
}

/// Failure raised by an [`HttpTransport`](crate::transport::HttpTransport)
/// before any response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error from the reqwest client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn run_failed(name: Option<&str>, message: Option<&str>) -> Error {
        Error::RunFailed {
            state_type: "FAILED".to_string(),
            state_name: name.map(str::to_string),
            state_message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_run_failed_message_type_only() {
        assert_eq!(
            run_failed(None, None).to_string(),
            "Flow run ended in state: FAILED"
        );
    }

    #[test]
    fn test_run_failed_message_with_name_and_detail() {
        assert_eq!(
            run_failed(Some("Failed"), Some("boom")).to_string(),
            "Flow run ended in state: FAILED (Failed) - boom"
        );
    }

    #[test]
    fn test_run_failed_message_detail_without_name() {
        assert_eq!(
            run_failed(None, Some("boom")).to_string(),
            "Flow run ended in state: FAILED - boom"
        );
    }

    #[test]
    fn test_connection_message_names_url() {
        let err = Error::Connection {
            url: "http://localhost:4200/api/flow_runs/r1".to_string(),
            source: TransportError::Other("connection refused".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("http://localhost:4200/api/flow_runs/r1"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_poll_message_differs_from_connect() {
        let err = Error::Poll {
            url: "http://localhost:4200/api/flow_runs/r1".to_string(),
            source: TransportError::Other("connection reset".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.starts_with(
            "Failed to poll flow run status from Prefect API at http://localhost:4200/api/flow_runs/r1."
        ));
        assert!(msg.ends_with("Error: connection reset"));
    }

    #[test]
    fn test_status_classification() {
        let err = Error::Api {
            status: 404,
            message: "Not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = Error::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_server_error());
        assert!(!run_failed(None, None).is_client_error());
        assert!(run_failed(None, None).is_run_failure());
    }
}
