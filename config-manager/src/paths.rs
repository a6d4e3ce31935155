use std::path::PathBuf;

use crate::error::ConfigError;

/// Get XDG config directory for the gateway
/// Returns ~/.config/onvif-gateway or $XDG_CONFIG_HOME/onvif-gateway
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|p| p.join("onvif-gateway"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Get default gateway config file path
/// Returns ~/.config/onvif-gateway/gateway.toml
pub fn gateway_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("gateway.toml"))
}
