//! SOAP fault and preset trigger error types

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use camera_control::CameraError;
use thiserror::Error;

use crate::soap::SOAP_CONTENT_TYPE;
use crate::templates;

/// SOAP 1.2 fault code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    Sender,
    Receiver,
}

impl FaultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::Sender => "s:Sender",
            FaultCode::Receiver => "s:Receiver",
        }
    }
}

pub const SUBCODE_NOT_AUTHORIZED: &str = "ter:NotAuthorized";
pub const SUBCODE_INVALID_ARG_VAL: &str = "ter:InvalidArgVal";
pub const SUBCODE_ACTION_FAILED: &str = "ter:Action/Failure";

/// A fault returned to the ONVIF client in place of a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{subcode}: {reason}")]
pub struct SoapFault {
    pub code: FaultCode,
    pub subcode: &'static str,
    pub reason: String,
}

impl SoapFault {
    /// Deliberately generic: never says which credential was wrong.
    pub fn not_authorized() -> Self {
        Self {
            code: FaultCode::Sender,
            subcode: SUBCODE_NOT_AUTHORIZED,
            reason: "The action requested requires authorization and the sender is not authorized"
                .to_string(),
        }
    }

    pub fn invalid_args(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            code: FaultCode::Sender,
            subcode: SUBCODE_INVALID_ARG_VAL,
            reason: if reason.is_empty() {
                "Invalid arguments".to_string()
            } else {
                reason
            },
        }
    }

    pub fn action_failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            code: FaultCode::Receiver,
            subcode: SUBCODE_ACTION_FAILED,
            reason: if reason.is_empty() {
                "The requested action failed".to_string()
            } else {
                reason
            },
        }
    }

    pub fn render(&self) -> String {
        templates::fault(self.code.as_str(), self.subcode, &self.reason)
    }
}

impl From<CameraError> for SoapFault {
    fn from(e: CameraError) -> Self {
        SoapFault::action_failed(e.to_string())
    }
}

impl IntoResponse for SoapFault {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)],
            self.render(),
        )
            .into_response()
    }
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("message-bus preset triggers are not enabled")]
    Disabled,
}
