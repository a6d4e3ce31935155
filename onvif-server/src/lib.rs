//! ONVIF Server Library
//!
//! Presents the configured cameras to NVR clients as ONVIF devices.
//! Device, Media, PTZ and Imaging requests arrive as SOAP over HTTP and are
//! translated into camera control commands.
//!
//! Every action except GetSystemDateAndTime requires WS-Security
//! UsernameToken authentication.

pub mod device;
mod error;
pub mod imaging;
pub mod media;
pub mod ptz;
mod snapshot;
pub mod soap;
mod templates;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use camera_control::Registry;
use config_manager::ServerConfig;
use tracing::{info, warn};
use ws_security::{Credentials, NonceCache, Validator};

pub use device::{DeviceRequest, DeviceService};
pub use error::{FaultCode, SoapFault, TriggerError};
pub use imaging::{ImagingRequest, ImagingService};
pub use media::{MediaRequest, MediaService};
pub use ptz::{DisabledTrigger, PresetTrigger, PtzRequest, PtzService};
pub use soap::{MAX_BODY_SIZE, SOAP_CONTENT_TYPE};

/// The origin advertised in capability XAddrs and snapshot URIs.
pub fn base_url(onvif_port: u16) -> String {
    format!("http://localhost:{}", onvif_port)
}

/// Shared state for every request
pub struct GatewayState {
    pub validator: Validator,
    pub credentials: Credentials,
    pub registry: Arc<Registry>,
    pub device: DeviceService,
    pub media: MediaService,
    pub ptz: PtzService,
    pub imaging: ImagingService,
}

impl GatewayState {
    pub fn new(
        config: &ServerConfig,
        registry: Arc<Registry>,
        nonces: Arc<NonceCache>,
        trigger: Arc<dyn PresetTrigger>,
    ) -> Self {
        let credentials = Credentials {
            username: config.auth.username.clone(),
            password: config.auth.password.clone(),
        };
        let base = base_url(config.onvif_port);

        Self {
            validator: Validator::new(credentials.clone(), nonces),
            credentials,
            device: DeviceService::new(&config.device_name, &base),
            media: MediaService::new(
                Arc::clone(&registry),
                &config.relay.rtsp_host,
                config.relay.rtsp_port,
                &base,
            ),
            ptz: PtzService::new(Arc::clone(&registry), trigger),
            imaging: ImagingService::new(Arc::clone(&registry)),
            registry,
        }
    }
}

/// The four ONVIF services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Device,
    Media,
    Ptz,
    Imaging,
}

impl Service {
    /// Service owning `action`, for requests posted to `/`.
    pub fn for_action(action: &str) -> Option<Self> {
        match action {
            "GetDeviceInformation" | "GetSystemDateAndTime" | "GetCapabilities" => {
                Some(Service::Device)
            }
            "GetProfiles" | "GetStreamUri" | "GetSnapshotUri" => Some(Service::Media),
            "GetNodes" | "GetConfigurations" | "ContinuousMove" | "Stop" | "GotoHomePosition"
            | "GetPresets" | "GotoPreset" | "AbsoluteMove" | "RelativeMove" => Some(Service::Ptz),
            "GetImagingSettings" | "SetImagingSettings" | "GetOptions" => Some(Service::Imaging),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Service::Device => "device",
            Service::Media => "media",
            Service::Ptz => "ptz",
            Service::Imaging => "imaging",
        }
    }
}

/// Build the HTTP router: the four service endpoints, the `/` fallback for
/// clients that ignore capability XAddrs, and the snapshot endpoint.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/onvif/device_service", post(device_service))
        .route("/onvif/media_service", post(media_service))
        .route("/onvif/ptz_service", post(ptz_service))
        .route("/onvif/imaging_service", post(imaging_service))
        .route("/", post(root_service))
        .route("/snapshot", get(snapshot::missing))
        .route("/snapshot/", get(snapshot::missing))
        .route("/snapshot/{camera}", get(snapshot::snapshot))
        // Oversized bodies are reported as a SOAP fault in dispatch
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn device_service(State(state): State<Arc<GatewayState>>, body: Body) -> Response {
    dispatch(&state, Some(Service::Device), body).await
}

async fn media_service(State(state): State<Arc<GatewayState>>, body: Body) -> Response {
    dispatch(&state, Some(Service::Media), body).await
}

async fn ptz_service(State(state): State<Arc<GatewayState>>, body: Body) -> Response {
    dispatch(&state, Some(Service::Ptz), body).await
}

async fn imaging_service(State(state): State<Arc<GatewayState>>, body: Body) -> Response {
    dispatch(&state, Some(Service::Imaging), body).await
}

async fn root_service(State(state): State<Arc<GatewayState>>, body: Body) -> Response {
    dispatch(&state, None, body).await
}

async fn dispatch(state: &GatewayState, route: Option<Service>, body: Body) -> Response {
    match handle_soap(state, route, body).await {
        Ok(xml) => soap::respond(&xml),
        Err(fault) => fault.into_response(),
    }
}

/// Read, authenticate and route one SOAP request.
///
/// `route` is `None` for the `/` fallback, which picks the service from
/// the action name.
async fn handle_soap(
    state: &GatewayState,
    route: Option<Service>,
    body: Body,
) -> Result<String, SoapFault> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|_| SoapFault::action_failed("Failed to read request body"))?;
    let xml = std::str::from_utf8(&bytes)
        .map_err(|_| SoapFault::action_failed("Failed to parse SOAP action"))?;
    let action = soap::parse_action(xml)?;

    let service = match route {
        Some(service) => service,
        None => Service::for_action(&action.name).ok_or_else(|| {
            warn!(action = %action.name, "Unknown action on root path");
            SoapFault::action_failed(format!("Unknown action: {}", action.name))
        })?,
    };
    info!(
        service = service.as_str(),
        action = %action.name,
        fallback = route.is_none(),
        "SOAP request"
    );

    let exempt = service == Service::Device && !DeviceRequest::decode(&action).requires_auth();
    if !exempt {
        if let Err(e) = state.validator.authenticate(xml) {
            warn!(action = %action.name, "Authentication failed: {}", e);
            return Err(SoapFault::not_authorized());
        }
    }

    match service {
        Service::Device => state.device.handle(DeviceRequest::decode(&action)),
        Service::Media => state.media.handle(MediaRequest::decode(&action)),
        Service::Ptz => state.ptz.handle(PtzRequest::decode(&action)?).await,
        Service::Imaging => state.imaging.handle(ImagingRequest::decode(&action)?).await,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use config_manager::GatewayConfig;
    use std::net::SocketAddr;
    use tower::ServiceExt;

    const USER: &str = "admin";
    const PASS: &str = "s3cret";

    fn server_config() -> ServerConfig {
        let config: GatewayConfig = toml::from_str(
            r#"
[server]
onvif_port = 8080
device_name = "Relay"
[server.auth]
username = "admin"
password = "s3cret"
"#,
        )
        .unwrap();
        config.server
    }

    async fn app() -> (Router, SocketAddr, FakeCamera, Arc<Registry>) {
        let (addr, cam) = spawn_fake_camera().await;
        let registry = registry_with(&[camera_toml("porch", addr)]);
        let state = GatewayState::new(
            &server_config(),
            Arc::clone(&registry),
            Arc::new(NonceCache::default()),
            Arc::new(DisabledTrigger),
        );
        (router(Arc::new(state)), addr, cam, registry)
    }

    fn post_xml(uri: &str, xml: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(Body::from(xml))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn auth() -> String {
        plaintext_security(USER, PASS)
    }

    #[tokio::test]
    async fn test_time_query_needs_no_auth() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml(
                "/onvif/device_service",
                envelope("", "<tds:GetSystemDateAndTime/>"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            SOAP_CONTENT_TYPE
        );
        let body = body_string(response).await;
        assert!(body.contains("GetSystemDateAndTimeResponse"));
    }

    #[tokio::test]
    async fn test_missing_auth_is_not_authorized() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml(
                "/onvif/device_service",
                envelope("", "<tds:GetDeviceInformation/>"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("ter:NotAuthorized"));
        assert!(!body.contains("Manufacturer"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_generic() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml(
                "/onvif/device_service",
                envelope(
                    &plaintext_security(USER, "wrong"),
                    "<tds:GetDeviceInformation/>",
                ),
            ))
            .await
            .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("ter:NotAuthorized"));
        assert!(!body.to_lowercase().contains("password"));
    }

    #[tokio::test]
    async fn test_device_information_with_auth() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml(
                "/onvif/device_service",
                envelope(&auth(), "<tds:GetDeviceInformation/>"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<tds:Manufacturer>AtomCam</tds:Manufacturer>"));
        assert!(body.contains("<tds:Model>Relay</tds:Model>"));
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/onvif/media_service")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_oversized_body_is_action_failed() {
        let (app, ..) = app().await;
        let padding = "x".repeat(MAX_BODY_SIZE);
        let xml = envelope(&auth(), &format!("<tds:GetDeviceInformation/><!--{}-->", padding));
        let response = app
            .oneshot(post_xml("/onvif/device_service", xml))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("ter:Action/Failure"));
        assert!(body.contains("Failed to read request body"));
    }

    #[tokio::test]
    async fn test_unparsable_body() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml("/onvif/device_service", "not xml <".to_string()))
            .await
            .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("Failed to parse SOAP action"));
    }

    #[tokio::test]
    async fn test_root_route_dispatches_by_action() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml("/", envelope(&auth(), "<trt:GetProfiles/>")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#"token="porch_hd""#));
    }

    #[tokio::test]
    async fn test_root_route_unknown_action() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml("/", envelope("", "<tds:Reboot/>")))
            .await
            .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("Unknown action: Reboot"));
    }

    #[tokio::test]
    async fn test_unknown_action_on_service_requires_auth_first() {
        let (app, ..) = app().await;
        let response = app
            .clone()
            .oneshot(post_xml(
                "/onvif/device_service",
                envelope("", "<tds:Reboot/>"),
            ))
            .await
            .unwrap();
        assert!(body_string(response).await.contains("ter:NotAuthorized"));

        let response = app
            .oneshot(post_xml(
                "/onvif/device_service",
                envelope(&auth(), "<tds:Reboot/>"),
            ))
            .await
            .unwrap();
        assert!(body_string(response).await.contains("Unknown action: Reboot"));
    }

    #[tokio::test]
    async fn test_small_velocity_stops() {
        let (app, _, cam, _) = app().await;
        let response = app
            .oneshot(post_xml(
                "/onvif/ptz_service",
                envelope(
                    &auth(),
                    r#"<tptz:ContinuousMove><tptz:ProfileToken>porch_hd</tptz:ProfileToken><tptz:Velocity><tt:PanTilt x="0.005" y="0"/></tptz:Velocity></tptz:ContinuousMove>"#,
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response)
            .await
            .contains("ContinuousMoveResponse"));
        assert_eq!(cam.commands.lock().as_slice(), ["move 0 0 0"]);
    }

    #[tokio::test]
    async fn test_digest_replay_rejected() {
        let (app, ..) = app().await;
        let security = digest_security(USER, PASS, b"0123456789abcdef");
        let xml = envelope(&security, "<tds:GetDeviceInformation/>");

        let first = app
            .clone()
            .oneshot(post_xml("/onvif/device_service", xml.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let replay = app
            .oneshot(post_xml("/onvif/device_service", xml))
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(replay).await.contains("ter:NotAuthorized"));
    }

    #[tokio::test]
    async fn test_imaging_through_router() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(post_xml(
                "/onvif/imaging_service",
                envelope(
                    &auth(),
                    "<timg:GetImagingSettings><timg:VideoSourceToken>porch_hd_VSC</timg:VideoSourceToken></timg:GetImagingSettings>",
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("IrCutFilter"));
    }

    fn snapshot_request(uri: &str, credentials: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(credentials) = credentials {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(credentials)),
            );
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_requires_basic_auth() {
        let (app, ..) = app().await;
        let response = app
            .clone()
            .oneshot(snapshot_request("/snapshot/porch", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            r#"Basic realm="ONVIF Relay Snapshot""#
        );

        let response = app
            .oneshot(snapshot_request("/snapshot/porch", Some("admin:nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_snapshot_status_codes() {
        let (app, _, cam, registry) = app().await;
        let creds = Some("admin:s3cret");

        let status = |uri: &'static str| {
            let app = app.clone();
            async move {
                app.oneshot(snapshot_request(uri, creds))
                    .await
                    .unwrap()
                    .status()
            }
        };

        assert_eq!(status("/snapshot/").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/snapshot").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/snapshot/..").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/snapshot/garage").await, StatusCode::NOT_FOUND);

        cam.broken.store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(
            status("/snapshot/porch").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        registry.get("porch").unwrap().set_healthy(false);
        assert_eq!(
            status("/snapshot/porch").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_snapshot_success() {
        let (app, ..) = app().await;
        let response = app
            .oneshot(snapshot_request("/snapshot/porch", Some("admin:s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), [0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn test_service_for_action() {
        assert_eq!(Service::for_action("GetCapabilities"), Some(Service::Device));
        assert_eq!(Service::for_action("GetSnapshotUri"), Some(Service::Media));
        assert_eq!(Service::for_action("RelativeMove"), Some(Service::Ptz));
        assert_eq!(Service::for_action("GetOptions"), Some(Service::Imaging));
        assert_eq!(Service::for_action("GetStatus"), None);
    }
}
