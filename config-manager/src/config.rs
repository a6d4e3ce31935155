use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

pub const DEFAULT_RELAY_RTSP_HOST: &str = "mediamtx";
pub const DEFAULT_RELAY_RTSP_PORT: u16 = 8554;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub onvif_port: u16,
    pub device_name: String,
    /// Answer WS-Discovery probes
    #[serde(default)]
    pub discovery: bool,
    pub auth: AuthConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Credentials ONVIF clients must present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// External media relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the relay control API. Empty disables path orchestration.
    #[serde(default)]
    pub api: String,
    /// Host advertised in stream URIs
    #[serde(default = "default_rtsp_host")]
    pub rtsp_host: String,
    #[serde(default = "default_rtsp_port")]
    pub rtsp_port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api: String::new(),
            rtsp_host: default_rtsp_host(),
            rtsp_port: default_rtsp_port(),
        }
    }
}

impl RelayConfig {
    pub fn enabled(&self) -> bool {
        !self.api.is_empty()
    }
}

fn default_rtsp_host() -> String {
    DEFAULT_RELAY_RTSP_HOST.to_string()
}

fn default_rtsp_port() -> u16 {
    DEFAULT_RELAY_RTSP_PORT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub name: String,
    pub host: String,
    pub rtsp_port: u16,
    pub http_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_audio_transcode")]
    pub audio_transcode: String,
    #[serde(default = "default_audio_volume")]
    pub audio_volume: f64,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
    #[serde(default)]
    pub streams: Vec<StreamConfig>,
    #[serde(default)]
    pub ptz: PtzConfig,
}

fn default_audio_transcode() -> String {
    "pcm_mulaw".to_string()
}

fn default_audio_volume() -> f64 {
    1.0
}

impl CameraConfig {
    /// Control credentials, only when both username and password are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }

    pub fn stream_by_path(&self, path: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.path == path)
    }

    pub fn stream_by_profile(&self, profile_name: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.profile_name == profile_name)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub ptz: bool,
    #[serde(default)]
    pub ir: bool,
}

/// How the relay serves a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Relay launches a transcoder on demand
    #[default]
    Transcode,
    /// Relay pulls the camera RTSP stream directly
    Proxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub path: String,
    pub resolution: String,
    pub codec: String,
    /// Used as the ONVIF profile token
    pub profile_name: String,
    /// Direct stream URL. When set the relay is not configured for this stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtsp_url: Option<String>,
    #[serde(default)]
    pub relay_mode: RelayMode,
}

impl StreamConfig {
    pub fn is_h265(&self) -> bool {
        matches!(self.codec.to_ascii_lowercase().as_str(), "h265" | "hevc")
    }

    /// Parse "WxH", falling back to 1920x1080.
    pub fn dimensions(&self) -> (u32, u32) {
        self.resolution
            .split_once('x')
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .filter(|&(w, h)| w > 0 && h > 0)
            .unwrap_or((1920, 1080))
    }

    /// Whether the relay should carry this stream.
    pub fn relay_managed(&self) -> bool {
        self.rtsp_url.as_deref().map_or(true, str::is_empty)
    }
}

/// Native pan/tilt in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtzPosition {
    pub pan: i32,
    pub tilt: i32,
}

impl PtzPosition {
    /// Centre of the pan/tilt range.
    pub const MIDPOINT: PtzPosition = PtzPosition { pan: 177, tilt: 90 };

    pub fn new(pan: i32, tilt: i32) -> Self {
        Self { pan, tilt }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PtzConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PtzPosition>,
    /// Horizontal field of view in degrees, 0 disables FOV-relative addressing
    #[serde(default)]
    pub horizontal_fov: f64,
    #[serde(default)]
    pub vertical_fov: f64,
    #[serde(default)]
    pub presets: Vec<PresetConfig>,
}

impl PtzConfig {
    /// Both FOV values are set, so coordinates address the current view.
    pub fn fov_enabled(&self) -> bool {
        self.horizontal_fov > 0.0 && self.vertical_fov > 0.0
    }

    /// Preset lookup by token, defaulting tokens to the 1-based index.
    pub fn preset(&self, token: &str) -> Option<&PresetConfig> {
        self.presets
            .iter()
            .enumerate()
            .find(|(i, p)| p.token_or_index(*i) == token)
            .map(|(_, p)| p)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub pan: i32,
    #[serde(default)]
    pub tilt: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_broker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_message: Option<String>,
}

/// What recalling a preset does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetAction {
    Move { pan: i32, tilt: i32 },
    Trigger {
        broker: String,
        topic: String,
        message: String,
    },
}

impl PresetConfig {
    pub fn token_or_index(&self, index: usize) -> String {
        match self.token.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => (index + 1).to_string(),
        }
    }

    /// A preset with both broker and topic is a trigger, anything else a move.
    pub fn action(&self) -> PresetAction {
        match (self.trigger_broker.as_deref(), self.trigger_topic.as_deref()) {
            (Some(broker), Some(topic)) if !broker.is_empty() && !topic.is_empty() => {
                PresetAction::Trigger {
                    broker: broker.to_string(),
                    topic: topic.to_string(),
                    message: self.trigger_message.clone().unwrap_or_default(),
                }
            }
            _ => PresetAction::Move {
                pan: self.pan,
                tilt: self.tilt,
            },
        }
    }
}

impl GatewayConfig {
    /// Get default config path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        paths::gateway_config_path()
    }

    /// Load config from default XDG location
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::gateway_config_path()?;
        Self::load_from(&path)
    }

    /// Load config from specific path. Does not validate.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Still using the shipped `admin`/`admin` credentials.
    pub fn uses_default_credentials(&self) -> bool {
        self.server.auth.username == "admin" && self.server.auth.password == "admin"
    }
}
