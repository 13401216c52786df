//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config or key file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Duration string in neither `<n><unit>` nor ISO-8601 form.
    #[error("invalid duration '{value}' (expected e.g. '5s', '500ms', '2m' or 'PT10S')")]
    InvalidDuration { value: String },

    /// Poll frequency that would poll without pausing.
    #[error("poll frequency must be greater than zero, got '{value}'")]
    ZeroPollFrequency { value: String },
}
