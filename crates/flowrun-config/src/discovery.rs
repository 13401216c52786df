//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/flowrun/config.toml` (XDG user config)
//! 2. `./flowrun.toml` (project-local)
//! 3. An explicit `--config` file
//! 4. CLI arguments and environment (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, FlowrunConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "flowrun.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "flowrun";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "FLOWRUN_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: FlowrunConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (e.g., plaintext API keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Options controlling config discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions<'a> {
    /// Directory searched for `flowrun.toml` (defaults to the current directory).
    pub project_dir: Option<&'a Path>,
    /// User config directory (defaults to `FLOWRUN_CONFIG_DIR` or the platform dir).
    pub config_dir: Option<&'a Path>,
    /// Explicit config file; must exist and parse.
    pub explicit: Option<&'a Path>,
}

/// Load configuration with default discovery.
pub fn load_config() -> Result<LoadedConfig> {
    load_config_with_options(&LoadOptions::default())
}

/// Load configuration by discovering and merging all config layers.
///
/// Discovered files that fail to parse are skipped with a warning; an
/// explicit file that cannot be read or parsed is an error.
pub fn load_config_with_options(options: &LoadOptions<'_>) -> Result<LoadedConfig> {
    let mut config = FlowrunConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    // 1. User config
    let user_config_path = match options.config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    // 2. Project-local config
    let project_path = options
        .project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    // 3. Explicit file
    if let Some(path) = options.explicit {
        config.merge(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        });
    }

    if config.connection.has_plaintext_api_key() {
        warnings.push(
            "[connection] contains a plaintext api-key. \
             Consider api-key-env or api-key-file instead."
                .to_string(),
        );
    }

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<FlowrunConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    FlowrunConfig::from_toml(&contents)
}

/// Get the user config file path.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the user config directory for flowrun.
///
/// Checks `FLOWRUN_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut FlowrunConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options<'a>(user: &'a TempDir, project: &'a TempDir) -> LoadOptions<'a> {
        LoadOptions {
            project_dir: Some(project.path()),
            config_dir: Some(user.path()),
            explicit: None,
        }
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let loaded = load_config_with_options(&options(&user, &project)).unwrap();
        assert_eq!(loaded.config, FlowrunConfig::new());
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_project_overrides_user() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[connection]\napi-url = \"https://api.prefect.cloud/api\"\naccount-id = \"acct\"\n",
        )
        .unwrap();
        fs::write(
            project.path().join("flowrun.toml"),
            "[connection]\napi-url = \"http://127.0.0.1:4200/api\"\n",
        )
        .unwrap();

        let loaded = load_config_with_options(&options(&user, &project)).unwrap();
        assert_eq!(
            loaded.config.connection.api_url.as_deref(),
            Some("http://127.0.0.1:4200/api")
        );
        assert_eq!(loaded.config.connection.account_id.as_deref(), Some("acct"));
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_explicit_file_overrides_everything() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("flowrun.toml"), "[run]\nwait = true\n").unwrap();
        let explicit = project.path().join("ci.toml");
        fs::write(&explicit, "[run]\nwait = false\n").unwrap();

        let mut opts = options(&user, &project);
        opts.explicit = Some(&explicit);

        let loaded = load_config_with_options(&opts).unwrap();
        assert!(!loaded.config.run.wait());
        assert_eq!(loaded.loaded_from().last(), Some(&explicit.as_path()));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let missing = project.path().join("nope.toml");

        let mut opts = options(&user, &project);
        opts.explicit = Some(&missing);

        assert!(matches!(
            load_config_with_options(&opts),
            Err(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_broken_discovered_file_becomes_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "not [valid toml").unwrap();

        let loaded = load_config_with_options(&options(&user, &project)).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("config.toml"));
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_plaintext_key_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("flowrun.toml"),
            "[connection]\napi-key = \"pnu_plain\"\n",
        )
        .unwrap();

        let loaded = load_config_with_options(&options(&user, &project)).unwrap();
        assert!(loaded.warnings.iter().any(|w| w.contains("plaintext")));
    }

    #[test]
    fn test_xdg_config_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("config.toml"));
        }
    }
}
