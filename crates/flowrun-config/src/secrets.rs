//! API key resolution.
//!
//! Resolution order:
//! 1. Plaintext `api-key` value (with warning at load time)
//! 2. `api-key-file`
//! 3. `api-key-env`
//!
//! Empty values at any step are skipped.

use std::path::{Path, PathBuf};

use crate::{ConfigError, ConnectionSection, Result};

/// Result of API key resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Config file (plaintext — not recommended).
    ConfigFile,
    /// Dedicated key file.
    KeyFile(PathBuf),
    /// Environment variable.
    EnvVar(String),
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
            SecretSource::KeyFile(path) => write!(f, "key file {}", path.display()),
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
        }
    }
}

/// Resolve the API key configured in a `[connection]` section.
///
/// A configured key file that exists but cannot be read is an error; a
/// missing key file falls through to the next source.
pub fn resolve_api_key(section: &ConnectionSection) -> Result<Option<ResolvedSecret>> {
    if let Some(value) = section.api_key.as_deref().filter(|v| !v.trim().is_empty()) {
        return Ok(Some(ResolvedSecret {
            value: value.to_string(),
            source: SecretSource::ConfigFile,
        }));
    }

    if let Some(path) = &section.api_key_file {
        let expanded = expand_path(path);
        if expanded.exists() {
            let value = std::fs::read_to_string(&expanded)
                .map_err(|e| ConfigError::ReadFile {
                    path: expanded.display().to_string(),
                    source: e,
                })?
                .trim()
                .to_string();
            if !value.is_empty() {
                return Ok(Some(ResolvedSecret {
                    value,
                    source: SecretSource::KeyFile(expanded),
                }));
            }
        }
    }

    if let Some(var) = &section.api_key_env
        && let Ok(value) = std::env::var(var)
        && !value.is_empty()
    {
        return Ok(Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(var.clone()),
        }));
    }

    Ok(None)
}

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str()
        && let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
