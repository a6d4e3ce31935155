//! Startup validation of the gateway configuration.
//!
//! Names end up in URLs and relay path names, hosts and credentials end up on a
//! transcoder command line, so all of them are restricted to small character sets.

use std::collections::HashSet;

use crate::config::{CameraConfig, GatewayConfig, PtzPosition, ServerConfig, StreamConfig};
use crate::error::ConfigError;

const AUDIO_CODECS: &[&str] = &["pcm_mulaw", "pcm_alaw", "aac"];
const VIDEO_CODECS: &[&str] = &["h264", "h265", "hevc"];

/// `[A-Za-z0-9_-]+`
fn is_valid_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `[A-Za-z0-9._-]+`
fn is_valid_host(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// `[A-Za-z0-9@._-]+`
fn is_valid_credential(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '-' | '_'))
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn check_port(field: &str, port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(invalid(format!("invalid {}: 0 (must be 1-65535)", field)));
    }
    Ok(())
}

fn check_position(field: &str, pos: PtzPosition) -> Result<(), ConfigError> {
    if !(0..=355).contains(&pos.pan) || !(0..=180).contains(&pos.tilt) {
        return Err(invalid(format!(
            "{} ({}, {}) out of range (pan 0-355, tilt 0-180)",
            field, pos.pan, pos.tilt
        )));
    }
    Ok(())
}

impl GatewayConfig {
    /// Validate the whole configuration, failing on the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .validate()
            .map_err(|e| invalid(format!("server config: {}", e.reason())))?;

        if self.cameras.is_empty() {
            return Err(invalid("at least one camera must be configured"));
        }

        let mut names = HashSet::new();
        let mut profiles = HashSet::new();
        for (i, camera) in self.cameras.iter().enumerate() {
            camera
                .validate()
                .map_err(|e| invalid(format!("camera[{}] ({}): {}", i, camera.name, e.reason())))?;

            if !names.insert(camera.name.as_str()) {
                return Err(invalid(format!("duplicate camera name: {}", camera.name)));
            }
            for stream in &camera.streams {
                if !profiles.insert(stream.profile_name.as_str()) {
                    return Err(invalid(format!(
                        "profile name {} is used by more than one camera",
                        stream.profile_name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl ConfigError {
    fn reason(&self) -> String {
        match self {
            ConfigError::Invalid(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_port("onvif_port", self.onvif_port)?;

        if self.device_name.trim().is_empty() {
            return Err(invalid("device_name is required"));
        }

        if self.auth.username.is_empty() {
            return Err(invalid("auth.username is required"));
        }
        if !is_valid_credential(&self.auth.username) {
            return Err(invalid("invalid auth.username: only [A-Za-z0-9@._-] allowed"));
        }
        if self.auth.password.is_empty() {
            return Err(invalid("auth.password is required"));
        }
        if !is_valid_credential(&self.auth.password) {
            return Err(invalid("invalid auth.password: only [A-Za-z0-9@._-] allowed"));
        }

        // Empty api disables the relay entirely
        if self.relay.enabled() {
            if !self.relay.api.starts_with("http://") && !self.relay.api.starts_with("https://") {
                return Err(invalid("relay.api must start with http:// or https://"));
            }
            check_port("relay.rtsp_port", self.relay.rtsp_port)?;
        }

        Ok(())
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_name(&self.name) {
            return Err(invalid(format!(
                "invalid camera name: {:?} (only alphanumeric, hyphen, and underscore allowed)",
                self.name
            )));
        }
        if !is_valid_host(&self.host) {
            return Err(invalid(format!("invalid host: {:?}", self.host)));
        }
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            if !is_valid_credential(username) {
                return Err(invalid("invalid username: only [A-Za-z0-9@._-] allowed"));
            }
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            if !is_valid_credential(password) {
                return Err(invalid("invalid password: only [A-Za-z0-9@._-] allowed"));
            }
        }

        check_port("rtsp_port", self.rtsp_port)?;
        check_port("http_port", self.http_port)?;

        if self.streams.is_empty() {
            return Err(invalid("at least one stream must be configured"));
        }

        let mut paths = HashSet::new();
        let mut profiles = HashSet::new();
        for (i, stream) in self.streams.iter().enumerate() {
            stream
                .validate()
                .map_err(|e| invalid(format!("stream[{}]: {}", i, e.reason())))?;
            if !paths.insert(stream.path.as_str()) {
                return Err(invalid(format!("duplicate stream path: {}", stream.path)));
            }
            if !profiles.insert(stream.profile_name.as_str()) {
                return Err(invalid(format!("duplicate profile name: {}", stream.profile_name)));
            }
        }

        if !AUDIO_CODECS.contains(&self.audio_transcode.as_str()) {
            return Err(invalid(format!(
                "invalid audio_transcode: {} (must be pcm_mulaw, pcm_alaw, or aac)",
                self.audio_transcode
            )));
        }
        if self.audio_volume.is_nan() || self.audio_volume < 0.0 {
            return Err(invalid("audio_volume must be >= 0"));
        }

        let fov_ok = |v: f64| !v.is_nan() && v >= 0.0;
        if !fov_ok(self.ptz.horizontal_fov) || !fov_ok(self.ptz.vertical_fov) {
            return Err(invalid("ptz field of view must be >= 0"));
        }
        if let Some(home) = self.ptz.home {
            check_position("ptz.home", home)?;
        }
        for preset in &self.ptz.presets {
            if matches!(preset.action(), crate::config::PresetAction::Move { .. }) {
                check_position(
                    &format!("preset {:?}", preset.name),
                    PtzPosition::new(preset.pan, preset.tilt),
                )?;
            }
        }

        Ok(())
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_name(&self.path) {
            return Err(invalid(format!(
                "invalid stream path: {:?} (only alphanumeric, hyphen, and underscore allowed)",
                self.path
            )));
        }
        if !is_valid_name(&self.profile_name) {
            return Err(invalid(format!(
                "invalid profile name: {:?} (only alphanumeric, hyphen, and underscore allowed)",
                self.profile_name
            )));
        }
        if !VIDEO_CODECS.contains(&self.codec.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!(
                "invalid codec: {} (must be h264 or h265)",
                self.codec
            )));
        }
        Ok(())
    }
}
