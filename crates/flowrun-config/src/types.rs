//! Configuration file types.
//!
//! ```toml
//! [connection]
//! api-url = "http://127.0.0.1:4200/api"
//! api-key-env = "PREFECT_API_KEY"
//! account-id = "..."
//! workspace-id = "..."
//!
//! [run]
//! wait = true
//! poll-frequency = "PT10S"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_poll_frequency;

/// Poll frequency used when none is configured.
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_secs(5);

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlowrunConfig {
    /// How to reach the Prefect API.
    #[serde(default)]
    pub connection: ConnectionSection,

    /// Run defaults.
    #[serde(default)]
    pub run: RunSection,
}

impl FlowrunConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: FlowrunConfig) {
        self.connection.merge(other.connection);
        self.run.merge(other.run);
    }
}

/// `[connection]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectionSection {
    /// API base URL, e.g. `https://api.prefect.cloud/api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key in plaintext (discouraged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// File containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// Environment variable containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Prefect Cloud account id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Prefect Cloud workspace id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl ConnectionSection {
    fn merge(&mut self, other: ConnectionSection) {
        if other.api_url.is_some() {
            self.api_url = other.api_url;
        }
        // Any explicit key source in the overriding layer replaces all
        // key sources from lower layers.
        if other.api_key.is_some() || other.api_key_file.is_some() || other.api_key_env.is_some()
        {
            self.api_key = other.api_key;
            self.api_key_file = other.api_key_file;
            self.api_key_env = other.api_key_env;
        }
        if other.account_id.is_some() {
            self.account_id = other.account_id;
        }
        if other.workspace_id.is_some() {
            self.workspace_id = other.workspace_id;
        }
    }

    /// Whether the API key is stored in plaintext in the file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Copy with the plaintext key masked, for display.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSection {
    /// Wait for the run to reach a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<bool>,

    /// Interval between status polls, e.g. `"5s"` or `"PT10S"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_frequency: Option<String>,
}

impl RunSection {
    fn merge(&mut self, other: RunSection) {
        if other.wait.is_some() {
            self.wait = other.wait;
        }
        if other.poll_frequency.is_some() {
            self.poll_frequency = other.poll_frequency;
        }
    }

    /// Effective wait flag (defaults to `true`).
    pub fn wait(&self) -> bool {
        self.wait.unwrap_or(true)
    }

    /// Effective poll frequency; zero is rejected.
    pub fn poll_frequency(&self) -> crate::Result<Duration> {
        match &self.poll_frequency {
            Some(value) => parse_poll_frequency(value),
            None => Ok(DEFAULT_POLL_FREQUENCY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = FlowrunConfig::from_toml(
            r#"
[connection]
api-url = "http://127.0.0.1:4200/api"
api-key-env = "MY_KEY"
account-id = "acct"
workspace-id = "ws"

[run]
wait = false
poll-frequency = "PT10S"
"#,
        )
        .unwrap();

        assert_eq!(
            config.connection.api_url.as_deref(),
            Some("http://127.0.0.1:4200/api")
        );
        assert_eq!(config.connection.api_key_env.as_deref(), Some("MY_KEY"));
        assert_eq!(config.connection.account_id.as_deref(), Some("acct"));
        assert!(!config.run.wait());
        assert_eq!(
            config.run.poll_frequency().unwrap(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = FlowrunConfig::from_toml("").unwrap();
        assert_eq!(config, FlowrunConfig::new());
        assert!(config.run.wait());
        assert_eq!(config.run.poll_frequency().unwrap(), DEFAULT_POLL_FREQUENCY);
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        let err = FlowrunConfig::from_toml("[run]\nwait = \"yes\"\n").unwrap_err();
        assert!(matches!(err, crate::ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_overrides_fields() {
        let mut base = FlowrunConfig::from_toml(
            r#"
[connection]
api-url = "https://api.prefect.cloud/api"
account-id = "acct"
workspace-id = "ws"

[run]
poll-frequency = "5s"
"#,
        )
        .unwrap();

        let overlay = FlowrunConfig::from_toml(
            r#"
[connection]
workspace-id = "other"

[run]
wait = false
"#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(
            base.connection.api_url.as_deref(),
            Some("https://api.prefect.cloud/api")
        );
        assert_eq!(base.connection.account_id.as_deref(), Some("acct"));
        assert_eq!(base.connection.workspace_id.as_deref(), Some("other"));
        assert_eq!(base.run.wait, Some(false));
        assert_eq!(base.run.poll_frequency.as_deref(), Some("5s"));
    }

    #[test]
    fn test_merge_replaces_key_sources_together() {
        let mut base = FlowrunConfig::new();
        base.connection.api_key = Some("plain".to_string());

        let mut overlay = FlowrunConfig::new();
        overlay.connection.api_key_env = Some("PREFECT_API_KEY".to_string());

        base.merge(overlay);
        assert_eq!(base.connection.api_key, None);
        assert_eq!(
            base.connection.api_key_env.as_deref(),
            Some("PREFECT_API_KEY")
        );
    }

    #[test]
    fn test_invalid_poll_frequency() {
        let run = RunSection {
            wait: None,
            poll_frequency: Some("often".to_string()),
        };
        assert!(run.poll_frequency().is_err());
    }

    #[test]
    fn test_zero_poll_frequency_rejected() {
        let config = FlowrunConfig::from_toml("[run]\npoll-frequency = \"0s\"\n").unwrap();
        assert!(matches!(
            config.run.poll_frequency(),
            Err(crate::ConfigError::ZeroPollFrequency { .. })
        ));
    }

    #[test]
    fn test_redacted_and_round_trip() {
        let mut config = FlowrunConfig::new();
        config.connection.api_key = Some("secret".to_string());
        config.connection.account_id = Some("acct".to_string());

        assert!(config.connection.has_plaintext_api_key());
        let shown = config.connection.redacted();
        assert_eq!(shown.api_key.as_deref(), Some("<redacted>"));

        let toml = config.to_toml().unwrap();
        assert!(toml.contains("account-id = \"acct\""));
        assert_eq!(FlowrunConfig::from_toml(&toml).unwrap(), config);
    }
}
