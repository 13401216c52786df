//! Configuration for flowrun.
//!
//! Provides TOML-based configuration with:
//! - A `[connection]` section describing how to reach the Prefect API
//! - A `[run]` section with wait / poll-frequency defaults
//! - Config file layering (XDG user config + project-local + explicit file)
//! - API key resolution (plaintext → key file → env var)

pub mod discovery;
pub mod duration;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    ConfigSource, LoadOptions, LoadedConfig, load_config, load_config_file,
    load_config_with_options, xdg_config_dir, xdg_config_path,
};
pub use duration::{parse_duration, parse_poll_frequency};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, expand_path, resolve_api_key};
pub use types::*;
