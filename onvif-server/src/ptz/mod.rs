//! PTZ service.
//!
//! The camera reports no position, so every move is computed against the
//! camera's PTZ estimate (the last commanded position) and the estimate is
//! updated before the command is sent.

pub mod coordinate;
mod trigger;

use std::sync::Arc;

use camera_control::{Camera, PtzPosition, Registry};
use config_manager::PresetAction;
use tracing::{debug, info};

use crate::error::SoapFault;
use crate::soap::{attr_f64, Element};
use crate::templates;
use coordinate::{
    clamp_unit, continuous_delta, fov_absolute_delta, fov_relative_delta, magnitude, move_speed,
    move_speed_override, offset_position, onvif_to_native, preset_speed, relative_in_onvif_space,
    STOP_THRESHOLD,
};

pub use trigger::{DisabledTrigger, PresetTrigger};

/// Home used by GotoHomePosition when the camera has none configured.
pub const FALLBACK_HOME: PtzPosition = PtzPosition { pan: 160, tilt: 130 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

/// A PTZ vector or speed: optional pan/tilt and optional zoom.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PtzVector {
    pub pan_tilt: Option<Vector2D>,
    pub zoom: Option<f64>,
}

impl PtzVector {
    fn decode(element: Option<&Element>) -> Result<Self, SoapFault> {
        let Some(element) = element else {
            return Ok(Self::default());
        };
        let pan_tilt = element
            .child("PanTilt")
            .map(|pt| {
                Ok::<_, SoapFault>(Vector2D {
                    x: attr_f64(pt, "x")?,
                    y: attr_f64(pt, "y")?,
                })
            })
            .transpose()?;
        let zoom = element.child("Zoom").map(|z| attr_f64(z, "x")).transpose()?;
        Ok(Self { pan_tilt, zoom })
    }

    /// This camera has no zoom, so zoom-only requests are accepted and ignored.
    pub fn is_zoom_only(&self) -> bool {
        self.zoom.is_some() && self.pan_tilt.is_none()
    }

    fn speed_pair(speed: Option<&PtzVector>) -> Option<(f64, f64)> {
        speed.and_then(|s| s.pan_tilt).map(|v| (v.x, v.y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PtzRequest {
    GetNodes,
    GetConfigurations,
    ContinuousMove {
        profile_token: String,
        velocity: PtzVector,
    },
    Stop {
        profile_token: String,
    },
    GotoHomePosition {
        profile_token: String,
        speed: Option<PtzVector>,
    },
    GetPresets {
        profile_token: String,
    },
    GotoPreset {
        profile_token: String,
        preset_token: String,
        speed: Option<PtzVector>,
    },
    AbsoluteMove {
        profile_token: String,
        position: PtzVector,
        speed: Option<PtzVector>,
    },
    RelativeMove {
        profile_token: String,
        translation: PtzVector,
        speed: Option<PtzVector>,
    },
    Unknown(String),
}

impl PtzRequest {
    pub fn decode(action: &Element) -> Result<Self, SoapFault> {
        let profile_token = action.child_text("ProfileToken").to_string();
        let speed = || -> Result<Option<PtzVector>, SoapFault> {
            action
                .child("Speed")
                .map(|s| PtzVector::decode(Some(s)))
                .transpose()
        };

        Ok(match action.name.as_str() {
            "GetNodes" => PtzRequest::GetNodes,
            "GetConfigurations" => PtzRequest::GetConfigurations,
            "ContinuousMove" => PtzRequest::ContinuousMove {
                profile_token,
                velocity: PtzVector::decode(action.child("Velocity"))?,
            },
            "Stop" => PtzRequest::Stop { profile_token },
            "GotoHomePosition" => PtzRequest::GotoHomePosition {
                profile_token,
                speed: speed()?,
            },
            "GetPresets" => PtzRequest::GetPresets { profile_token },
            "GotoPreset" => PtzRequest::GotoPreset {
                profile_token,
                preset_token: action.child_text("PresetToken").to_string(),
                speed: speed()?,
            },
            "AbsoluteMove" => PtzRequest::AbsoluteMove {
                profile_token,
                position: PtzVector::decode(action.child("Position"))?,
                speed: speed()?,
            },
            "RelativeMove" => PtzRequest::RelativeMove {
                profile_token,
                translation: PtzVector::decode(action.child("Translation"))?,
                speed: speed()?,
            },
            other => PtzRequest::Unknown(other.to_string()),
        })
    }
}

pub struct PtzService {
    registry: Arc<Registry>,
    trigger: Arc<dyn PresetTrigger>,
}

impl PtzService {
    pub fn new(registry: Arc<Registry>, trigger: Arc<dyn PresetTrigger>) -> Self {
        Self { registry, trigger }
    }

    pub async fn handle(&self, request: PtzRequest) -> Result<String, SoapFault> {
        match request {
            PtzRequest::GetNodes => Ok(templates::nodes()),
            PtzRequest::GetConfigurations => Ok(templates::configurations()),
            PtzRequest::ContinuousMove {
                profile_token,
                velocity,
            } => {
                self.continuous_move(&profile_token, velocity).await?;
                Ok(templates::empty_response("tptz:ContinuousMoveResponse"))
            }
            PtzRequest::Stop { profile_token } => {
                self.ptz_camera(&profile_token)?.client().ptz_stop().await?;
                Ok(templates::empty_response("tptz:StopResponse"))
            }
            PtzRequest::GotoHomePosition {
                profile_token,
                speed,
            } => {
                self.goto_home(&profile_token, speed.as_ref()).await?;
                Ok(templates::empty_response("tptz:GotoHomePositionResponse"))
            }
            PtzRequest::GetPresets { profile_token } => {
                let camera = self.ptz_camera(&profile_token)?;
                let presets: Vec<(String, String)> = camera
                    .config()
                    .ptz
                    .presets
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.token_or_index(i), p.name.clone()))
                    .collect();
                Ok(templates::presets(&presets))
            }
            PtzRequest::GotoPreset {
                profile_token,
                preset_token,
                speed,
            } => {
                self.goto_preset(&profile_token, &preset_token, speed.as_ref())
                    .await?;
                Ok(templates::empty_response("tptz:GotoPresetResponse"))
            }
            PtzRequest::AbsoluteMove {
                profile_token,
                position,
                speed,
            } => {
                self.absolute_move(&profile_token, position, speed.as_ref())
                    .await?;
                Ok(templates::empty_response("tptz:AbsoluteMoveResponse"))
            }
            PtzRequest::RelativeMove {
                profile_token,
                translation,
                speed,
            } => {
                self.relative_move(&profile_token, translation, speed.as_ref())
                    .await?;
                Ok(templates::empty_response("tptz:RelativeMoveResponse"))
            }
            PtzRequest::Unknown(action) => Err(SoapFault::action_failed(format!(
                "Unknown action: {}",
                action
            ))),
        }
    }

    /// Resolve a profile to its camera, which must support PTZ.
    fn ptz_camera(&self, profile_token: &str) -> Result<Arc<Camera>, SoapFault> {
        let profile = self.registry.profile(profile_token).ok_or_else(|| {
            SoapFault::action_failed(format!("profile not found: {}", profile_token))
        })?;
        if !profile.camera.supports_ptz() {
            return Err(SoapFault::action_failed(format!(
                "camera does not support PTZ: {}",
                profile.camera.name()
            )));
        }
        Ok(profile.camera)
    }

    async fn continuous_move(&self, token: &str, velocity: PtzVector) -> Result<(), SoapFault> {
        let camera = self.ptz_camera(token)?;
        if velocity.is_zoom_only() {
            return Ok(());
        }

        let (vx, vy) = velocity
            .pan_tilt
            .map_or((0.0, 0.0), |v| (clamp_unit(v.x), clamp_unit(v.y)));
        let mag = magnitude(vx, vy);
        if mag < STOP_THRESHOLD {
            debug!(camera = camera.name(), "ContinuousMove below threshold, stopping");
            camera.client().ptz_stop().await?;
            return Ok(());
        }

        let (delta_pan, delta_tilt) = continuous_delta(vx, vy);
        let target =
            camera.update_ptz_estimate(|current| offset_position(current, delta_pan, delta_tilt));
        let speed = move_speed(mag);
        debug!(
            camera = camera.name(),
            "ContinuousMove ({:.2}, {:.2}) -> ({}, {}) speed {}",
            vx,
            vy,
            target.pan,
            target.tilt,
            speed
        );
        camera.client().ptz_move(target.pan, target.tilt, speed).await?;
        Ok(())
    }

    async fn goto_home(&self, token: &str, speed: Option<&PtzVector>) -> Result<(), SoapFault> {
        let camera = self.ptz_camera(token)?;
        let home = camera.config().ptz.home.unwrap_or(FALLBACK_HOME);
        let speed = preset_speed(PtzVector::speed_pair(speed));

        camera.set_ptz_estimate(home);
        camera.client().ptz_move(home.pan, home.tilt, speed).await?;
        Ok(())
    }

    async fn goto_preset(
        &self,
        token: &str,
        preset_token: &str,
        speed: Option<&PtzVector>,
    ) -> Result<(), SoapFault> {
        let camera = self.ptz_camera(token)?;
        let action = camera
            .config()
            .ptz
            .preset(preset_token)
            .map(|p| p.action())
            .ok_or_else(|| SoapFault::action_failed(format!("preset not found: {}", preset_token)))?;

        match action {
            PresetAction::Trigger {
                broker,
                topic,
                message,
            } => {
                info!(
                    camera = camera.name(),
                    preset = preset_token,
                    broker = %broker,
                    topic = %topic,
                    "GotoPreset: firing trigger"
                );
                self.trigger
                    .fire(&broker, &topic, &message)
                    .await
                    .map_err(|e| {
                        SoapFault::action_failed(format!(
                            "failed to trigger preset {}: {}",
                            preset_token, e
                        ))
                    })
            }
            PresetAction::Move { pan, tilt } => {
                let speed = preset_speed(PtzVector::speed_pair(speed));
                camera.set_ptz_estimate(PtzPosition::new(pan, tilt));
                camera.client().ptz_move(pan, tilt, speed).await?;
                Ok(())
            }
        }
    }

    async fn absolute_move(
        &self,
        token: &str,
        position: PtzVector,
        speed: Option<&PtzVector>,
    ) -> Result<(), SoapFault> {
        let camera = self.ptz_camera(token)?;
        if position.is_zoom_only() {
            return Ok(());
        }
        let Some(Vector2D { x, y }) = position.pan_tilt else {
            return Err(SoapFault::action_failed(
                "pan/tilt position required for AbsoluteMove",
            ));
        };
        if x.is_nan() || y.is_nan() {
            return Err(SoapFault::action_failed(format!(
                "invalid position values: x={}, y={}",
                x, y
            )));
        }

        let ptz = &camera.config().ptz;
        let target = if ptz.fov_enabled() {
            let (delta_pan, delta_tilt) = fov_absolute_delta(x, y, ptz.horizontal_fov, ptz.vertical_fov);
            camera.update_ptz_estimate(|current| offset_position(current, delta_pan, delta_tilt))
        } else {
            let target = onvif_to_native(x, y, 0.5).position();
            camera.set_ptz_estimate(target);
            target
        };
        let speed = move_speed_override(PtzVector::speed_pair(speed));

        debug!(
            camera = camera.name(),
            fov = ptz.fov_enabled(),
            "AbsoluteMove ({:.2}, {:.2}) -> ({}, {})",
            x,
            y,
            target.pan,
            target.tilt
        );
        camera.client().ptz_move(target.pan, target.tilt, speed).await?;
        Ok(())
    }

    async fn relative_move(
        &self,
        token: &str,
        translation: PtzVector,
        speed: Option<&PtzVector>,
    ) -> Result<(), SoapFault> {
        let camera = self.ptz_camera(token)?;
        if translation.is_zoom_only() {
            return Ok(());
        }
        let Some(Vector2D { x, y }) = translation.pan_tilt else {
            return Err(SoapFault::action_failed(
                "pan/tilt translation required for RelativeMove",
            ));
        };
        if x.is_nan() || y.is_nan() {
            return Err(SoapFault::action_failed(format!(
                "invalid translation values: x={}, y={} (NaN not allowed)",
                x, y
            )));
        }

        let ptz = &camera.config().ptz;
        let target = camera.update_ptz_estimate(|current| {
            if ptz.fov_enabled() {
                let (delta_pan, delta_tilt) =
                    fov_relative_delta(x, y, ptz.horizontal_fov, ptz.vertical_fov);
                offset_position(current, delta_pan, delta_tilt)
            } else {
                relative_in_onvif_space(current, x, y)
            }
        });
        let speed = move_speed_override(PtzVector::speed_pair(speed));

        debug!(
            camera = camera.name(),
            fov = ptz.fov_enabled(),
            "RelativeMove ({:.2}, {:.2}) -> ({}, {})",
            x,
            y,
            target.pan,
            target.tilt
        );
        camera.client().ptz_move(target.pan, target.tilt, speed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriggerError;
    use crate::soap::parse_action;
    use crate::test_support::{camera_toml, registry_with, spawn_fake_camera, FakeCamera};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTrigger {
        fired: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl PresetTrigger for RecordingTrigger {
        async fn fire(&self, broker: &str, topic: &str, message: &str) -> Result<(), TriggerError> {
            self.fired
                .lock()
                .push((broker.to_string(), topic.to_string(), message.to_string()));
            Ok(())
        }
    }

    const PTZ_EXTRA: &str = r#"
[[ptz.presets]]
name = "Door"
pan = 10
tilt = 20
[[ptz.presets]]
name = "Lights"
token = "lights"
trigger_broker = "tcp://broker:1883"
trigger_topic = "home/porch/lights"
trigger_message = "ON"
"#;

    async fn service(extra: &str) -> (PtzService, FakeCamera, Arc<RecordingTrigger>) {
        let (addr, cam) = spawn_fake_camera().await;
        let registry = registry_with(&[
            camera_toml("porch", addr) + extra,
            camera_toml("garage", addr).replace("ptz = true", "ptz = false"),
        ]);
        let trigger = Arc::new(RecordingTrigger::default());
        let svc = PtzService::new(registry, Arc::clone(&trigger) as Arc<dyn PresetTrigger>);
        (svc, cam, trigger)
    }

    fn continuous(x: f64, y: f64) -> PtzRequest {
        PtzRequest::ContinuousMove {
            profile_token: "porch_hd".into(),
            velocity: PtzVector {
                pan_tilt: Some(Vector2D { x, y }),
                zoom: None,
            },
        }
    }

    fn position(x: f64, y: f64) -> PtzVector {
        PtzVector {
            pan_tilt: Some(Vector2D { x, y }),
            zoom: None,
        }
    }

    #[test]
    fn test_decode_absolute_move() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:tptz="http://www.onvif.org/ver20/ptz/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema"><s:Body>
            <tptz:AbsoluteMove>
              <tptz:ProfileToken>porch_hd</tptz:ProfileToken>
              <tptz:Position><tt:PanTilt x="0.5" y="-0.25"/></tptz:Position>
              <tptz:Speed><tt:PanTilt x="1" y="1"/><tt:Zoom x="0"/></tptz:Speed>
            </tptz:AbsoluteMove></s:Body></s:Envelope>"#;
        let request = PtzRequest::decode(&parse_action(xml).unwrap()).unwrap();
        assert_eq!(
            request,
            PtzRequest::AbsoluteMove {
                profile_token: "porch_hd".into(),
                position: position(0.5, -0.25),
                speed: Some(PtzVector {
                    pan_tilt: Some(Vector2D { x: 1.0, y: 1.0 }),
                    zoom: Some(0.0),
                }),
            }
        );
    }

    #[test]
    fn test_decode_bad_number() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>
            <ContinuousMove><ProfileToken>p</ProfileToken><Velocity><PanTilt x="left" y="0"/></Velocity></ContinuousMove>
            </s:Body></s:Envelope>"#;
        let fault = PtzRequest::decode(&parse_action(xml).unwrap()).unwrap_err();
        assert_eq!(fault.subcode, crate::error::SUBCODE_INVALID_ARG_VAL);
    }

    #[tokio::test]
    async fn test_continuous_move_from_midpoint() {
        let (svc, cam, _) = service("").await;
        svc.handle(continuous(0.5, 0.0)).await.unwrap();
        svc.handle(continuous(0.5, 0.0)).await.unwrap();
        assert_eq!(
            cam.commands.lock().as_slice(),
            ["move 179 90 7", "move 181 90 7"]
        );
    }

    #[tokio::test]
    async fn test_continuous_move_clamps_at_edge() {
        let (svc, cam, _) = service("[ptz]\nhome = { pan = 354, tilt = 0 }\n").await;
        svc.handle(continuous(1.0, -1.0)).await.unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 355 0 9"]);
    }

    #[tokio::test]
    async fn test_continuous_zoom_only_is_noop() {
        let (svc, cam, _) = service("").await;
        svc.handle(PtzRequest::ContinuousMove {
            profile_token: "porch_hd".into(),
            velocity: PtzVector {
                pan_tilt: None,
                zoom: Some(0.5),
            },
        })
        .await
        .unwrap();
        assert!(cam.commands.lock().is_empty());
    }

    #[tokio::test]
    async fn test_goto_home_defaults() {
        let (svc, cam, _) = service("").await;
        svc.handle(PtzRequest::GotoHomePosition {
            profile_token: "porch_hd".into(),
            speed: None,
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 160 130 5"]);
    }

    #[tokio::test]
    async fn test_goto_home_configured_with_speed() {
        let (svc, cam, _) = service("[ptz]\nhome = { pan = 100, tilt = 50 }\n").await;
        svc.handle(PtzRequest::GotoHomePosition {
            profile_token: "porch_hd".into(),
            speed: Some(position(1.0, 1.0)),
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 100 50 9"]);
    }

    #[tokio::test]
    async fn test_presets() {
        let (svc, cam, trigger) = service(PTZ_EXTRA).await;

        let xml = svc
            .handle(PtzRequest::GetPresets {
                profile_token: "porch_hd".into(),
            })
            .await
            .unwrap();
        assert!(xml.contains(r#"<tptz:Preset token="1"><tt:Name>Door</tt:Name>"#));
        assert!(xml.contains(r#"<tptz:Preset token="lights"><tt:Name>Lights</tt:Name>"#));

        svc.handle(PtzRequest::GotoPreset {
            profile_token: "porch_hd".into(),
            preset_token: "1".into(),
            speed: None,
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 10 20 5"]);

        svc.handle(PtzRequest::GotoPreset {
            profile_token: "porch_hd".into(),
            preset_token: "lights".into(),
            speed: None,
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().len(), 1);
        assert_eq!(
            trigger.fired.lock().as_slice(),
            [(
                "tcp://broker:1883".to_string(),
                "home/porch/lights".to_string(),
                "ON".to_string()
            )]
        );

        let fault = svc
            .handle(PtzRequest::GotoPreset {
                profile_token: "porch_hd".into(),
                preset_token: "9".into(),
                speed: None,
            })
            .await
            .unwrap_err();
        assert_eq!(fault.reason, "preset not found: 9");
    }

    #[tokio::test]
    async fn test_disabled_trigger_fails_preset() {
        let (addr, _cam) = spawn_fake_camera().await;
        let registry = registry_with(&[camera_toml("porch", addr) + PTZ_EXTRA]);
        let svc = PtzService::new(registry, Arc::new(DisabledTrigger));
        let fault = svc
            .handle(PtzRequest::GotoPreset {
                profile_token: "porch_hd".into(),
                preset_token: "lights".into(),
                speed: None,
            })
            .await
            .unwrap_err();
        assert_eq!(
            fault.reason,
            "failed to trigger preset lights: message-bus preset triggers are not enabled"
        );
    }

    #[tokio::test]
    async fn test_absolute_move_with_fov() {
        let (svc, cam, _) = service("[ptz]\nhorizontal_fov = 90.0\nvertical_fov = 60.0\n").await;
        svc.handle(PtzRequest::AbsoluteMove {
            profile_token: "porch_hd".into(),
            position: position(1.0, -1.0),
            speed: None,
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 222 120 5"]);
    }

    #[tokio::test]
    async fn test_absolute_move_full_range() {
        let (svc, cam, _) = service("").await;
        svc.handle(PtzRequest::AbsoluteMove {
            profile_token: "porch_hd".into(),
            position: position(-1.0, 1.0),
            speed: Some(position(1.0, 0.0)),
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 0 0 9"]);
    }

    #[tokio::test]
    async fn test_relative_move_without_fov() {
        let (svc, cam, _) = service("").await;
        svc.handle(PtzRequest::RelativeMove {
            profile_token: "porch_hd".into(),
            translation: position(0.5, 0.0),
            speed: None,
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 266 90 5"]);
    }

    #[tokio::test]
    async fn test_relative_move_with_fov() {
        let (svc, cam, _) = service("[ptz]\nhorizontal_fov = 90.0\nvertical_fov = 60.0\n").await;
        svc.handle(PtzRequest::RelativeMove {
            profile_token: "porch_hd".into(),
            translation: position(0.5, 0.5),
            speed: None,
        })
        .await
        .unwrap();
        // 177 + round(22.5), 90 + round(-15)
        assert_eq!(cam.commands.lock().as_slice(), ["move 200 75 5"]);
    }

    #[tokio::test]
    async fn test_continuous_move_non_finite_velocity() {
        let (svc, cam, _) = service("").await;
        svc.handle(continuous(1e12, 0.0)).await.unwrap();
        svc.handle(continuous(f64::INFINITY, f64::NEG_INFINITY)).await.unwrap();
        svc.handle(continuous(f64::NAN, 0.0)).await.unwrap();
        assert_eq!(
            cam.commands.lock().as_slice(),
            ["move 182 90 9", "move 187 85 9", "move 0 0 0"]
        );
    }

    #[tokio::test]
    async fn test_absolute_move_with_fov_out_of_range() {
        let (svc, cam, _) = service("[ptz]\nhorizontal_fov = 90.0\nvertical_fov = 60.0\n").await;
        svc.handle(PtzRequest::AbsoluteMove {
            profile_token: "porch_hd".into(),
            position: position(1e12, 0.0),
            speed: Some(position(f64::INFINITY, 0.0)),
        })
        .await
        .unwrap();
        assert_eq!(cam.commands.lock().as_slice(), ["move 222 90 9"]);
    }

    #[tokio::test]
    async fn test_relative_move_with_fov_saturates() {
        let (svc, cam, _) = service("[ptz]\nhorizontal_fov = 90.0\nvertical_fov = 60.0\n").await;
        for _ in 0..4 {
            svc.handle(PtzRequest::RelativeMove {
                profile_token: "porch_hd".into(),
                translation: position(f64::NEG_INFINITY, 1e12),
                speed: None,
            })
            .await
            .unwrap();
        }
        assert_eq!(
            cam.commands.lock().as_slice(),
            ["move 132 60 5", "move 87 30 5", "move 42 0 5", "move 0 0 5"]
        );
    }

    #[tokio::test]
    async fn test_rejections() {
        let (svc, cam, _) = service("").await;

        let fault = svc
            .handle(PtzRequest::Stop {
                profile_token: "garage_hd".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(fault.reason, "camera does not support PTZ: garage");

        let fault = svc
            .handle(PtzRequest::Stop {
                profile_token: "attic_hd".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(fault.reason, "profile not found: attic_hd");

        let fault = svc
            .handle(PtzRequest::AbsoluteMove {
                profile_token: "porch_hd".into(),
                position: PtzVector::default(),
                speed: None,
            })
            .await
            .unwrap_err();
        assert!(fault.reason.contains("pan/tilt position required"));

        let fault = svc
            .handle(PtzRequest::RelativeMove {
                profile_token: "porch_hd".into(),
                translation: position(f64::NAN, 0.0),
                speed: None,
            })
            .await
            .unwrap_err();
        assert!(fault.reason.contains("NaN not allowed"));

        assert!(cam.commands.lock().is_empty());
    }
}
