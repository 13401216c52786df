//! CLI command handlers.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use flowrun_config::{LoadOptions, LoadedConfig};

pub mod config;
pub mod run;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit config file from `--config`.
    pub config_path: Option<PathBuf>,
}

impl Context {
    /// Discover and merge config files, logging any load warnings.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let options = LoadOptions {
            explicit: self.config_path.as_deref(),
            ..Default::default()
        };
        let loaded = flowrun_config::load_config_with_options(&options)
            .context("failed to load configuration")?;

        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        Ok(loaded)
    }
}
