//! Per-camera runtime state.

use std::sync::atomic::{AtomicBool, Ordering};

use config_manager::{CameraConfig, PtzPosition, StreamConfig};
use parking_lot::Mutex;

use crate::client::CameraClient;
use crate::error::CameraError;

/// A configured camera with its control client, health flag and PTZ estimate.
///
/// The firmware reports no position, so the gateway tracks the last commanded
/// position instead. `None` means no move has been commanded yet; reads then
/// fall back to the configured home position or the midpoint.
#[derive(Debug)]
pub struct Camera {
    config: CameraConfig,
    client: CameraClient,
    healthy: AtomicBool,
    ptz_estimate: Mutex<Option<PtzPosition>>,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        let client = CameraClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: CameraConfig, client: CameraClient) -> Self {
        tracing::debug!(camera = %config.name, "Camera initialised");
        Self {
            config,
            client,
            healthy: AtomicBool::new(true),
            ptz_estimate: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn client(&self) -> &CameraClient {
        &self.client
    }

    pub fn supports_ptz(&self) -> bool {
        self.config.capabilities.ptz
    }

    pub fn supports_ir(&self) -> bool {
        self.config.capabilities.ir
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    pub fn stream_by_profile(&self, profile_name: &str) -> Option<&StreamConfig> {
        self.config.stream_by_profile(profile_name)
    }

    /// Position used when no move has been commanded yet.
    pub fn default_position(&self) -> PtzPosition {
        self.config.ptz.home.unwrap_or(PtzPosition::MIDPOINT)
    }

    /// Last commanded position, or the default position.
    pub fn ptz_estimate(&self) -> PtzPosition {
        self.ptz_estimate.lock().unwrap_or_else(|| self.default_position())
    }

    pub fn set_ptz_estimate(&self, position: PtzPosition) {
        *self.ptz_estimate.lock() = Some(position);
    }

    /// Compute and store a new estimate under one lock acquisition.
    ///
    /// Concurrent moves on the same camera are serialised here; the closure
    /// sees the estimate left by the previous move.
    pub fn update_ptz_estimate<F>(&self, f: F) -> PtzPosition
    where
        F: FnOnce(PtzPosition) -> PtzPosition,
    {
        let mut guard = self.ptz_estimate.lock();
        let current = guard.unwrap_or_else(|| self.default_position());
        let next = f(current);
        *guard = Some(next);
        next
    }

    pub fn shutdown(&self) {
        self.client.shutdown();
    }
}
