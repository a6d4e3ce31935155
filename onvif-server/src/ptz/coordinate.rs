//! Conversions between ONVIF normalized PTZ space and the camera's native
//! degree/speed space.
//!
//! ONVIF: x, y in [-1, 1] with +y meaning up; velocity in [0, 1].
//! Native: pan in [0, 355], tilt in [0, 180] with 0 meaning up; speed in [1, 9].
//! Nothing here performs I/O or checks camera capabilities.

use config_manager::PtzPosition;

pub const PAN_MAX: i32 = 355;
pub const TILT_MAX: i32 = 180;
pub const SPEED_MIN: i32 = 1;
pub const SPEED_MAX: i32 = 9;

/// Velocity magnitudes below this are treated as an implicit stop.
pub const STOP_THRESHOLD: f64 = 0.01;

/// Degrees moved per ContinuousMove request at full velocity.
const CONTINUOUS_STEP: f64 = 5.0;

/// Speed used when a move request carries no usable speed.
pub const DEFAULT_SPEED: i32 = 5;

/// A native move target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTarget {
    pub pan: i32,
    pub tilt: i32,
    pub speed: i32,
}

impl NativeTarget {
    pub fn position(&self) -> PtzPosition {
        PtzPosition::new(self.pan, self.tilt)
    }
}

/// Clamp an ONVIF component into [-1, 1]. NaN counts as 0.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}

/// Map an absolute ONVIF position and velocity to native coordinates.
///
/// Speed is never 0, which the camera would read as "stop".
pub fn onvif_to_native(x: f64, y: f64, velocity: f64) -> NativeTarget {
    let x = clamp_unit(x);
    let y = clamp_unit(y);
    let velocity = clamp_unit(velocity).max(0.0);

    let pan = ((x + 1.0) * 177.5).round() as i32;
    let tilt = ((1.0 - y) * 90.0).round() as i32;
    let speed = ((velocity * 8.0).round() as i32 + 1).clamp(SPEED_MIN, SPEED_MAX);

    NativeTarget { pan, tilt, speed }
}

/// Inverse of the position part of [`onvif_to_native`].
pub fn native_to_onvif(pan: i32, tilt: i32) -> (f64, f64) {
    let x = f64::from(pan) / 177.5 - 1.0;
    let y = 1.0 - f64::from(tilt) / 90.0;
    (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0))
}

pub fn clamp_position(pan: i32, tilt: i32) -> PtzPosition {
    PtzPosition::new(pan.clamp(0, PAN_MAX), tilt.clamp(0, TILT_MAX))
}

/// Apply a native offset to `current`, staying inside the native range.
pub fn offset_position(current: PtzPosition, delta_pan: i32, delta_tilt: i32) -> PtzPosition {
    clamp_position(
        current.pan.saturating_add(delta_pan),
        current.tilt.saturating_add(delta_tilt),
    )
}

/// Offset for an absolute move addressed within the current view.
///
/// Tilt uses `(1 - y)` scaled by half the vertical FOV, minus the truncated
/// half FOV, so y = 1 is the top edge of the view.
pub fn fov_absolute_delta(x: f64, y: f64, horizontal_fov: f64, vertical_fov: f64) -> (i32, i32) {
    let (x, y) = (clamp_unit(x), clamp_unit(y));
    let half_h = horizontal_fov / 2.0;
    let half_v = vertical_fov / 2.0;
    let pan = (x * half_h).round() as i32;
    let tilt = ((1.0 - y) * half_v).round() as i32 - half_v as i32;
    (pan, tilt)
}

/// Offset for a relative move expressed as a fraction of the current view.
///
/// This is deliberately not the same tilt formula as [`fov_absolute_delta`].
pub fn fov_relative_delta(x: f64, y: f64, horizontal_fov: f64, vertical_fov: f64) -> (i32, i32) {
    let (x, y) = (clamp_unit(x), clamp_unit(y));
    let pan = (x * horizontal_fov / 2.0).round() as i32;
    let tilt = (-y * vertical_fov / 2.0).round() as i32;
    (pan, tilt)
}

/// Relative move without FOV: add the translation in ONVIF space.
pub fn relative_in_onvif_space(current: PtzPosition, x: f64, y: f64) -> PtzPosition {
    let (cx, cy) = native_to_onvif(current.pan, current.tilt);
    let nx = clamp_unit(cx + clamp_unit(x));
    let ny = clamp_unit(cy + clamp_unit(y));
    onvif_to_native(nx, ny, 0.5).position()
}

/// Per-request step for ContinuousMove. Tilt follows the velocity sign as-is.
pub fn continuous_delta(vx: f64, vy: f64) -> (i32, i32) {
    (
        (clamp_unit(vx) * CONTINUOUS_STEP) as i32,
        (clamp_unit(vy) * CONTINUOUS_STEP) as i32,
    )
}

pub fn magnitude(x: f64, y: f64) -> f64 {
    (x * x + y * y).sqrt()
}

/// Speed for continuous, absolute and relative moves: 5..=9.
///
/// The firmware misbehaves at low speeds, so the lower half is never used.
pub fn move_speed(magnitude: f64) -> i32 {
    let magnitude = if magnitude.is_nan() { 0.0 } else { magnitude.clamp(0.0, 2.0) };
    ((magnitude * 4.0).round() as i32 + 5).clamp(5, SPEED_MAX)
}

/// Optional speed override for absolute and relative moves.
pub fn move_speed_override(speed: Option<(f64, f64)>) -> i32 {
    let mag = speed.map_or(0.0, |(x, y)| magnitude(clamp_unit(x), clamp_unit(y)));
    if mag > STOP_THRESHOLD {
        move_speed(mag)
    } else {
        DEFAULT_SPEED
    }
}

/// Speed for home and preset moves: the mean of both components mapped to 1..=9.
pub fn preset_speed(speed: Option<(f64, f64)>) -> i32 {
    match speed.map(|(x, y)| (clamp_unit(x), clamp_unit(y))) {
        Some((x, y)) if x * x + y * y > STOP_THRESHOLD => {
            (((x + y) / 2.0 * 8.0) as i32 + 1).clamp(SPEED_MIN, SPEED_MAX)
        }
        _ => DEFAULT_SPEED,
    }
}
