use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config file not found at {0}")]
    NotFound(String),

    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("Invalid config: {0}")]
    Invalid(String),
}
