//! JPEG snapshot endpoint.
//!
//! `GET /snapshot/{camera}` behind HTTP Basic auth. The image is fetched
//! from the camera on every request and passed through unchanged.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};
use ws_security::{secure_eq, Credentials};

use crate::GatewayState;

const REALM_HEADER: &str = r#"Basic realm="ONVIF Relay Snapshot""#;

pub async fn snapshot(
    State(state): State<Arc<GatewayState>>,
    Path(camera): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &headers, &camera).await
}

/// `/snapshot` and `/snapshot/` with no camera name.
pub async fn missing(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    serve(&state, &headers, "").await
}

async fn serve(state: &GatewayState, headers: &HeaderMap, name: &str) -> Response {
    if !basic_auth_ok(headers, &state.credentials) {
        warn!(camera = name, "Snapshot request failed basic auth");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, REALM_HEADER)],
            "Unauthorized",
        )
            .into_response();
    }

    if !valid_camera_name(name) {
        return (StatusCode::BAD_REQUEST, "Invalid camera name").into_response();
    }

    let Some(camera) = state.registry.get(name) else {
        return (StatusCode::NOT_FOUND, "Camera not found").into_response();
    };

    if !camera.is_healthy() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Camera unavailable").into_response();
    }

    match camera.client().snapshot().await {
        Ok(jpeg) => {
            debug!(camera = name, bytes = jpeg.len(), "Snapshot served");
            (StatusCode::OK, [(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response()
        }
        Err(e) => {
            warn!(camera = name, "Snapshot failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get snapshot").into_response()
        }
    }
}

fn valid_camera_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains("..") && !name.contains('\\')
}

fn basic_auth_ok(headers: &HeaderMap, credentials: &Credentials) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((user, pass)) = decoded.split_once(':') else {
        return false;
    };

    // Evaluate both so a wrong username costs the same as a wrong password
    let user_ok = secure_eq(user, &credentials.username);
    let pass_ok = secure_eq(pass, &credentials.password);
    user_ok & pass_ok
}
