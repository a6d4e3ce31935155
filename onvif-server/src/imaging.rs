//! Imaging service

use std::sync::Arc;

use camera_control::{
    Camera, CameraError, Registry, DEFAULT_EXPOSURE_MAX, DEFAULT_EXPOSURE_MIN,
};

use crate::error::SoapFault;
use crate::soap::{parse_f64, Element};
use crate::templates;

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureSettings {
    pub mode: String,
    pub min_exposure_time: Option<f64>,
    pub max_exposure_time: Option<f64>,
}

/// Fields a client asked to change. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagingSettings {
    pub brightness: Option<f64>,
    pub color_saturation: Option<f64>,
    pub contrast: Option<f64>,
    pub sharpness: Option<f64>,
    pub ir_cut_filter: Option<String>,
    pub exposure: Option<ExposureSettings>,
}

fn optional_f64(element: &Element, name: &str) -> Result<Option<f64>, SoapFault> {
    element.child(name).map(|c| parse_f64(c.text())).transpose()
}

impl ImagingSettings {
    fn decode(element: Option<&Element>) -> Result<Self, SoapFault> {
        let Some(element) = element else {
            return Ok(Self::default());
        };
        let exposure = element
            .child("Exposure")
            .map(|e| {
                Ok::<_, SoapFault>(ExposureSettings {
                    mode: e.child_text("Mode").to_string(),
                    min_exposure_time: optional_f64(e, "MinExposureTime")?,
                    max_exposure_time: optional_f64(e, "MaxExposureTime")?,
                })
            })
            .transpose()?;

        Ok(Self {
            brightness: optional_f64(element, "Brightness")?,
            color_saturation: optional_f64(element, "ColorSaturation")?,
            contrast: optional_f64(element, "Contrast")?,
            sharpness: optional_f64(element, "Sharpness")?,
            ir_cut_filter: element.child("IrCutFilter").map(|c| c.text().to_string()),
            exposure,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagingRequest {
    GetImagingSettings {
        video_source_token: String,
    },
    SetImagingSettings {
        video_source_token: String,
        settings: ImagingSettings,
    },
    GetOptions {
        video_source_token: String,
    },
    Unknown(String),
}

impl ImagingRequest {
    pub fn decode(action: &Element) -> Result<Self, SoapFault> {
        let video_source_token = action.child_text("VideoSourceToken").to_string();
        Ok(match action.name.as_str() {
            "GetImagingSettings" => ImagingRequest::GetImagingSettings { video_source_token },
            "SetImagingSettings" => ImagingRequest::SetImagingSettings {
                video_source_token,
                settings: ImagingSettings::decode(action.child("ImagingSettings"))?,
            },
            "GetOptions" => ImagingRequest::GetOptions { video_source_token },
            other => ImagingRequest::Unknown(other.to_string()),
        })
    }
}

pub struct ImagingService {
    registry: Arc<Registry>,
}

impl ImagingService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, request: ImagingRequest) -> Result<String, SoapFault> {
        match request {
            ImagingRequest::GetImagingSettings { .. } => {
                Ok(templates::imaging_settings().to_string())
            }
            ImagingRequest::GetOptions { .. } => Ok(templates::imaging_options().to_string()),
            ImagingRequest::SetImagingSettings {
                video_source_token,
                settings,
            } => {
                let camera = self.resolve_camera(&video_source_token)?;
                apply(&camera, &settings).await?;
                Ok(templates::empty_response("timg:SetImagingSettingsResponse"))
            }
            ImagingRequest::Unknown(action) => Err(SoapFault::action_failed(format!(
                "Unknown action: {}",
                action
            ))),
        }
    }

    /// Accepts a camera name, a profile token or a `{profile}_VSC` token.
    /// Anything else targets the first configured camera.
    fn resolve_camera(&self, token: &str) -> Result<Arc<Camera>, SoapFault> {
        let resolved = self
            .registry
            .get(token)
            .or_else(|| self.registry.profile(token).map(|p| p.camera))
            .or_else(|| {
                token
                    .strip_suffix("_VSC")
                    .and_then(|profile| self.registry.profile(profile))
                    .map(|p| p.camera)
            });

        match resolved {
            Some(camera) => Ok(camera),
            None => self
                .registry
                .first()
                .ok_or_else(|| SoapFault::action_failed("no cameras configured")),
        }
    }
}

async fn apply(camera: &Camera, settings: &ImagingSettings) -> Result<(), SoapFault> {
    let client = camera.client();
    let failed = |what: &str, e: CameraError| {
        SoapFault::action_failed(format!("failed to set {}: {}", what, e))
    };

    if let Some(v) = settings.brightness {
        client.set_brightness(v).await.map_err(|e| failed("brightness", e))?;
    }
    if let Some(v) = settings.contrast {
        client.set_contrast(v).await.map_err(|e| failed("contrast", e))?;
    }
    if let Some(v) = settings.color_saturation {
        client.set_saturation(v).await.map_err(|e| failed("saturation", e))?;
    }
    if let Some(v) = settings.sharpness {
        client.set_sharpness(v).await.map_err(|e| failed("sharpness", e))?;
    }
    if let Some(mode) = settings.ir_cut_filter.as_deref() {
        if camera.supports_ir() {
            client
                .set_ir_cut_filter(mode)
                .await
                .map_err(|e| failed("IR cut filter", e))?;
        }
    }
    if let Some(exposure) = &settings.exposure {
        let min = exposure
            .min_exposure_time
            .map_or(DEFAULT_EXPOSURE_MIN, |v| v as i32);
        let max = exposure
            .max_exposure_time
            .map_or(DEFAULT_EXPOSURE_MAX, |v| v as i32);
        client
            .set_exposure(&exposure.mode, min, max)
            .await
            .map_err(|e| failed("exposure", e))?;
    }
    Ok(())
}
