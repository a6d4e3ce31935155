//! Device service

use chrono::{Local, Utc};

use crate::error::SoapFault;
use crate::soap::Element;
use crate::templates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRequest {
    GetDeviceInformation,
    GetSystemDateAndTime,
    GetCapabilities { categories: Vec<String> },
    Unknown(String),
}

impl DeviceRequest {
    pub fn decode(action: &Element) -> Self {
        match action.name.as_str() {
            "GetDeviceInformation" => DeviceRequest::GetDeviceInformation,
            "GetSystemDateAndTime" => DeviceRequest::GetSystemDateAndTime,
            "GetCapabilities" => DeviceRequest::GetCapabilities {
                categories: action
                    .children_named("Category")
                    .map(|c| c.text().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            },
            other => DeviceRequest::Unknown(other.to_string()),
        }
    }

    /// ONVIF clients call this before they have credentials to sync clocks.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, DeviceRequest::GetSystemDateAndTime)
    }
}

pub struct DeviceService {
    device_name: String,
    base_url: String,
}

impl DeviceService {
    pub fn new(device_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            base_url: base_url.into(),
        }
    }

    pub fn handle(&self, request: DeviceRequest) -> Result<String, SoapFault> {
        match request {
            DeviceRequest::GetDeviceInformation => {
                Ok(templates::device_information(&self.device_name))
            }
            DeviceRequest::GetSystemDateAndTime => Ok(templates::system_date_and_time(
                &Utc::now(),
                &Local::now(),
            )),
            DeviceRequest::GetCapabilities { categories } => Ok(self.capabilities(&categories)),
            DeviceRequest::Unknown(action) => Err(SoapFault::action_failed(format!(
                "Unknown action: {}",
                action
            ))),
        }
    }

    fn capabilities(&self, categories: &[String]) -> String {
        let all = categories.is_empty() || categories.iter().any(|c| c == "All");
        let wants = |name: &str| all || categories.iter().any(|c| c == name);

        let mut sections = String::new();
        if wants("Device") {
            sections.push_str(&templates::device_capability(&self.base_url));
        }
        if wants("Media") {
            sections.push_str(&templates::media_capability(&self.base_url));
        }
        if wants("PTZ") {
            sections.push_str(&templates::ptz_capability(&self.base_url));
        }
        if wants("Imaging") {
            sections.push_str(&templates::imaging_capability(&self.base_url));
        }
        templates::capabilities(&sections)
    }
}
