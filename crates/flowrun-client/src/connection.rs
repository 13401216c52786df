//! Connection settings and request addressing.
//!
//! A [`ConnectionConfig`] is either in *cloud mode* (both account and
//! workspace ids present) or *self-hosted mode*. The mode decides how
//! request URLs are assembled and which `Authorization` scheme is sent:
//!
//! | mode        | URL                                                  | auth                 |
//! |-------------|------------------------------------------------------|----------------------|
//! | cloud       | `{base}/accounts/{account}/workspaces/{workspace}{path}` | `Bearer <key>`   |
//! | self-hosted | `{base}{path}`                                       | `Basic <key>`        |

use std::fmt;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::{Error, Result};

/// Default API endpoint (Prefect Cloud).
pub const DEFAULT_API_URL: &str = "https://api.prefect.cloud/api";

/// Base URL of the Prefect Cloud UI.
const CLOUD_UI_URL: &str = "https://app.prefect.cloud";

/// Prefix that marks an API key as a complete Basic header value.
const BASIC_PREFIX: &str = "Basic ";

/// Addressing and authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Prefect Cloud: account/workspace scoped URLs, bearer auth.
    Cloud,
    /// Self-hosted server: plain URLs, basic auth.
    SelfHosted,
}

/// How to reach the remote API.
#[derive(Clone)]
pub struct ConnectionConfig {
    base_url: String,
    api_key: Option<String>,
    account_id: Option<String>,
    workspace_id: Option<String>,
}

impl ConnectionConfig {
    /// Create a config for the given API base URL with no credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            account_id: None,
            workspace_id: None,
        }
    }

    /// Create a cloud-mode config against the default endpoint.
    pub fn cloud(
        account_id: impl Into<String>,
        workspace_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::default()
            .with_account_id(account_id)
            .with_workspace_id(workspace_id)
            .with_api_key(api_key)
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the Prefect Cloud account id.
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the Prefect Cloud workspace id.
    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// The configured base URL, as given.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    /// Whether an API key will be sent.
    pub fn has_api_key(&self) -> bool {
        self.resolved_api_key().is_some()
    }

    /// Cloud mode iff both account and workspace ids are set.
    pub fn mode(&self) -> Mode {
        if self.account_id.is_some() && self.workspace_id.is_some() {
            Mode::Cloud
        } else {
            Mode::SelfHosted
        }
    }

    pub fn is_cloud(&self) -> bool {
        self.mode() == Mode::Cloud
    }

    /// Build the URL and headers for a request to `path`.
    ///
    /// `path` is appended verbatim and should start with `/`.
    pub fn build_request(&self, path: &str) -> Result<RequestDescriptor> {
        let url = format!("{}{}", self.api_root()?, path);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(value) = self.authorization()? {
            headers.insert(AUTHORIZATION, value);
        }

        Ok(RequestDescriptor { url, headers })
    }

    /// URL of the run's page in the Prefect UI.
    pub fn view_url(&self, run_id: &str) -> Result<String> {
        match self.mode() {
            Mode::Cloud => {
                let (account_id, workspace_id) = self.scope()?;
                Ok(format!(
                    "{}/account/{}/workspace/{}/flow-runs/flow-run/{}",
                    CLOUD_UI_URL, account_id, workspace_id, run_id
                ))
            }
            Mode::SelfHosted => {
                let base = self.resolved_base_url()?.replacen("/api", "", 1);
                Ok(format!("{}/flow-runs/flow-run/{}", base, run_id))
            }
        }
    }

    /// Base URL plus the account/workspace scope in cloud mode.
    fn api_root(&self) -> Result<String> {
        let base = self.resolved_base_url()?;
        match self.mode() {
            Mode::Cloud => {
                let (account_id, workspace_id) = self.scope()?;
                Ok(format!(
                    "{}/accounts/{}/workspaces/{}",
                    base, account_id, workspace_id
                ))
            }
            Mode::SelfHosted => Ok(base.to_string()),
        }
    }

    fn authorization(&self) -> Result<Option<HeaderValue>> {
        let Some(key) = self.resolved_api_key() else {
            return Ok(None);
        };

        let value = match self.mode() {
            Mode::Cloud => format!("Bearer {}", key),
            Mode::SelfHosted if key.starts_with(BASIC_PREFIX) => key.to_string(),
            Mode::SelfHosted => format!("{}{}", BASIC_PREFIX, key),
        };

        let mut value = HeaderValue::from_str(&value)
            .map_err(|_| Error::Configuration("API key is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    fn resolved_base_url(&self) -> Result<&str> {
        resolve(Some(&self.base_url))
            .ok_or_else(|| Error::Configuration("API URL is required".to_string()))
    }

    fn resolved_api_key(&self) -> Option<&str> {
        resolve(self.api_key.as_deref())
    }

    fn scope(&self) -> Result<(&str, &str)> {
        let account_id = resolve(self.account_id.as_deref()).ok_or_else(|| {
            Error::Configuration("account id is required for Prefect Cloud".to_string())
        })?;
        let workspace_id = resolve(self.workspace_id.as_deref()).ok_or_else(|| {
            Error::Configuration("workspace id is required for Prefect Cloud".to_string())
        })?;
        Ok((account_id, workspace_id))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("account_id", &self.account_id)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}

/// The value as given, or `None` when absent or blank.
fn resolve(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A fully addressed, authenticated request without its body.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Absolute request URL.
    pub url: String,
    /// Headers to send.
    pub headers: HeaderMap,
}
