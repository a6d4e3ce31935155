//! Gateway configuration: TOML model, loading and validation.

mod config;
mod error;
mod paths;
mod validation;

pub use config::{
    AuthConfig, CameraConfig, CapabilitiesConfig, GatewayConfig, PresetAction, PresetConfig,
    PtzConfig, PtzPosition, RelayConfig, RelayMode, ServerConfig, StreamConfig,
    DEFAULT_RELAY_RTSP_HOST, DEFAULT_RELAY_RTSP_PORT,
};
pub use error::ConfigError;
pub use paths::{config_dir, gateway_config_path};
