//! Media service: profiles, stream and snapshot URIs.

use std::sync::Arc;

use camera_control::{Profile, Registry};

use crate::error::SoapFault;
use crate::soap::Element;
use crate::templates::{self, ProfileView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRequest {
    GetProfiles,
    GetStreamUri { profile_token: String },
    GetSnapshotUri { profile_token: String },
    Unknown(String),
}

impl MediaRequest {
    pub fn decode(action: &Element) -> Self {
        let token = || action.child_text("ProfileToken").to_string();
        match action.name.as_str() {
            "GetProfiles" => MediaRequest::GetProfiles,
            "GetStreamUri" => MediaRequest::GetStreamUri {
                profile_token: token(),
            },
            "GetSnapshotUri" => MediaRequest::GetSnapshotUri {
                profile_token: token(),
            },
            other => MediaRequest::Unknown(other.to_string()),
        }
    }
}

pub struct MediaService {
    registry: Arc<Registry>,
    rtsp_host: String,
    rtsp_port: u16,
    snapshot_base: String,
}

impl MediaService {
    /// `snapshot_base` is the gateway's own HTTP origin, e.g. `http://localhost:8080`.
    pub fn new(
        registry: Arc<Registry>,
        rtsp_host: impl Into<String>,
        rtsp_port: u16,
        snapshot_base: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            rtsp_host: rtsp_host.into(),
            rtsp_port,
            snapshot_base: snapshot_base.into(),
        }
    }

    pub fn handle(&self, request: MediaRequest) -> Result<String, SoapFault> {
        match request {
            MediaRequest::GetProfiles => Ok(self.profiles()),
            MediaRequest::GetStreamUri { profile_token } => {
                let profile = self.lookup(&profile_token)?;
                Ok(templates::media_uri(
                    "GetStreamUriResponse",
                    &self.stream_uri(&profile),
                ))
            }
            MediaRequest::GetSnapshotUri { profile_token } => {
                let profile = self.lookup(&profile_token)?;
                let uri = format!("{}/snapshot/{}", self.snapshot_base, profile.camera.name());
                Ok(templates::media_uri("GetSnapshotUriResponse", &uri))
            }
            MediaRequest::Unknown(action) => Err(SoapFault::action_failed(format!(
                "Unknown action: {}",
                action
            ))),
        }
    }

    fn lookup(&self, token: &str) -> Result<Profile, SoapFault> {
        self.registry
            .profile(token)
            .ok_or_else(|| SoapFault::invalid_args(format!("profile not found: {}", token)))
    }

    /// Relay URL for the stream, unless the stream names its own.
    pub fn stream_uri(&self, profile: &Profile) -> String {
        match profile.stream.rtsp_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => format!(
                "rtsp://{}:{}/{}/{}",
                self.rtsp_host,
                self.rtsp_port,
                profile.camera.name(),
                profile.stream.path
            ),
        }
    }

    fn profiles(&self) -> String {
        let entries: Vec<String> = self
            .registry
            .profiles()
            .iter()
            .map(|p| {
                let (width, height) = p.stream.dimensions();
                templates::profile(&ProfileView {
                    token: p.token(),
                    encoding: if p.stream.is_h265() { "H265" } else { "H264" },
                    width,
                    height,
                    ptz: p.camera.supports_ptz(),
                })
            })
            .collect();
        templates::profiles(&entries.join("\n      "))
    }
}
