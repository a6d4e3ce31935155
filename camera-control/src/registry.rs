//! Camera registry and profile resolution.

use std::sync::Arc;

use config_manager::{CameraConfig, StreamConfig};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::camera::Camera;
use crate::error::CameraError;

/// A (camera, stream) pair addressed by its ONVIF profile token.
#[derive(Debug, Clone)]
pub struct Profile {
    pub camera: Arc<Camera>,
    pub stream: StreamConfig,
}

impl Profile {
    pub fn token(&self) -> &str {
        &self.stream.profile_name
    }
}

/// All configured cameras, in configuration order.
///
/// The list itself is behind a reader/writer lock. Health and PTZ state live
/// on each [`Camera`] so updates never take the registry lock.
#[derive(Debug, Default)]
pub struct Registry {
    cameras: RwLock<Vec<Arc<Camera>>>,
}

impl Registry {
    pub fn from_configs(configs: &[CameraConfig]) -> Result<Self, CameraError> {
        let cameras = configs
            .iter()
            .cloned()
            .map(|c| Camera::new(c).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_cameras(cameras))
    }

    pub fn from_cameras(cameras: Vec<Arc<Camera>>) -> Self {
        Self {
            cameras: RwLock::new(cameras),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Camera>> {
        self.cameras.read().iter().find(|c| c.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<Arc<Camera>> {
        self.cameras.read().clone()
    }

    pub fn first(&self) -> Option<Arc<Camera>> {
        self.cameras.read().first().cloned()
    }

    /// Every stream of every camera as a profile.
    pub fn profiles(&self) -> Vec<Profile> {
        self.cameras
            .read()
            .iter()
            .flat_map(|camera| {
                camera.config().streams.iter().map(move |stream| Profile {
                    camera: Arc::clone(camera),
                    stream: stream.clone(),
                })
            })
            .collect()
    }

    pub fn profile(&self, token: &str) -> Option<Profile> {
        let cameras = self.cameras.read();
        cameras.iter().find_map(|camera| {
            camera.stream_by_profile(token).map(|stream| Profile {
                camera: Arc::clone(camera),
                stream: stream.clone(),
            })
        })
    }

    /// Start each camera's digest challenge sweep.
    pub fn start_challenge_sweeps(&self) -> Vec<JoinHandle<()>> {
        self.cameras
            .read()
            .iter()
            .filter_map(|c| c.client().start_challenge_sweep())
            .collect()
    }

    /// Stop background work on every camera.
    pub fn shutdown(&self) {
        for camera in self.cameras.read().iter() {
            camera.shutdown();
        }
    }
}
