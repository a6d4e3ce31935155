//! Image adjustment commands.
//!
//! ONVIF levels are 0.0-1.0; the camera takes 0-255.

use crate::client::CameraClient;
use crate::error::CameraError;

/// Shortest exposure time the firmware accepts.
pub const DEFAULT_EXPOSURE_MIN: i32 = 1;
/// Longest exposure time the firmware accepts.
pub const DEFAULT_EXPOSURE_MAX: i32 = 1683;

/// Map an ONVIF level to the camera's 0-255 scale, truncating.
pub fn native_level(value: f64) -> u8 {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (clamped * 255.0) as u8
}

impl CameraClient {
    pub async fn set_brightness(&self, value: f64) -> Result<(), CameraError> {
        self.send_command(&format!("video bri {}", native_level(value)))
            .await
    }

    pub async fn set_contrast(&self, value: f64) -> Result<(), CameraError> {
        self.send_command(&format!("video cont {}", native_level(value)))
            .await
    }

    pub async fn set_saturation(&self, value: f64) -> Result<(), CameraError> {
        self.send_command(&format!("video sat {}", native_level(value)))
            .await
    }

    pub async fn set_sharpness(&self, value: f64) -> Result<(), CameraError> {
        self.send_command(&format!("video sharp {}", native_level(value)))
            .await
    }

    /// `ON` is day mode, `OFF` night mode, `AUTO` leaves it to the camera.
    pub async fn set_ir_cut_filter(&self, mode: &str) -> Result<(), CameraError> {
        match mode {
            "ON" => {
                self.send_command("property IrLED off").await?;
                self.send_command("property nightVision off").await
            }
            "OFF" => {
                self.send_command("property IrLED on").await?;
                self.send_command("property nightVision on").await
            }
            "AUTO" => self.send_command("property nightVision auto").await,
            other => Err(CameraError::InvalidMode {
                kind: "IR cut filter",
                mode: other.to_string(),
            }),
        }
    }

    /// Manual exposure pins both bounds to `max_time`.
    pub async fn set_exposure(
        &self,
        mode: &str,
        min_time: i32,
        max_time: i32,
    ) -> Result<(), CameraError> {
        match mode {
            "AUTO" => {
                self.send_command(&format!("video expr {} {}", min_time, max_time))
                    .await
            }
            "MANUAL" => {
                self.send_command(&format!("video expr {} {}", max_time, max_time))
                    .await
            }
            other => Err(CameraError::InvalidMode {
                kind: "exposure",
                mode: other.to_string(),
            }),
        }
    }
}
