//! Camera control: HTTP command client, per-camera state, registry and
//! health checking.

mod camera;
mod client;
mod error;
mod health;
mod imaging;
mod registry;

pub use camera::Camera;
pub use client::{CameraClient, MAX_SNAPSHOT_SIZE, REQUEST_TIMEOUT};
pub use config_manager::PtzPosition;
pub use error::CameraError;
pub use health::{HealthChecker, DEFAULT_HEALTH_INTERVAL, FAILURE_THRESHOLD};
pub use imaging::{native_level, DEFAULT_EXPOSURE_MAX, DEFAULT_EXPOSURE_MIN};
pub use registry::{Profile, Registry};
