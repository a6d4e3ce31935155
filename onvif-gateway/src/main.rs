//! ONVIF Gateway
//!
//! - Loads and validates the gateway configuration
//! - Makes the RTSP relay's paths match the configured streams
//! - Serves the ONVIF SOAP services and snapshots over HTTP
//! - Answers WS-Discovery probes when enabled

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use camera_control::{HealthChecker, Registry, DEFAULT_HEALTH_INTERVAL};
use clap::Parser;
use config_manager::GatewayConfig;
use onvif_server::{base_url, router, DisabledTrigger, GatewayState};
use relay_client::{path_name, PathConfig, RelayClient};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ws_discovery::Responder;
use ws_security::NonceCache;

/// How long the relay API gets to come up at startup.
const RELAY_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// In-flight HTTP requests get this long after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

const NONCE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "onvif-gateway")]
#[command(about = "Expose RTSP/HTTP cameras as ONVIF devices")]
struct Cli {
    /// Path to gateway.toml (defaults to the XDG config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<GatewayConfig> {
    let path = match path {
        Some(p) => p,
        None => GatewayConfig::default_path().context("failed to resolve default config path")?,
    };
    let config = GatewayConfig::load_from(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.validate().context("invalid configuration")?;
    info!(path = %path.display(), cameras = config.cameras.len(), "Configuration loaded");
    Ok(config)
}

/// Create every relay-managed stream path, one at a time.
async fn configure_relay(config: &GatewayConfig) -> Result<()> {
    let relay = &config.server.relay;
    let client = RelayClient::new(&relay.api).context("failed to create relay client")?;

    info!(api = %relay.api, "Waiting for relay API");
    client
        .wait_ready(RELAY_READY_TIMEOUT)
        .await
        .context("relay API did not become ready")?;

    for camera in &config.cameras {
        for stream in camera.streams.iter().filter(|s| s.relay_managed()) {
            let name = path_name(camera, stream);
            let path = PathConfig::for_stream(camera, stream, relay.rtsp_port);
            client
                .configure_path(&name, &path)
                .await
                .with_context(|| format!("failed to configure relay path {}", name))?;
            info!(path = %name, "Relay path configured");
        }
    }
    Ok(())
}

async fn wait_for_signal() -> Result<&'static str> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    })
}

/// Stop the digest and nonce sweeps. The health checker and discovery
/// follow the shared cancellation token instead.
fn stop_background(registry: &Registry, nonces: &NonceCache) {
    registry.shutdown();
    nonces.shutdown();
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = load_config(cli.config)?;
    if config.uses_default_credentials() {
        warn!("ONVIF credentials are still admin/admin, change them in the config file");
    }

    let registry = Arc::new(
        Registry::from_configs(&config.cameras).context("failed to initialise cameras")?,
    );
    registry.start_challenge_sweeps();
    for camera in registry.list() {
        info!(
            camera = camera.name(),
            ptz = camera.supports_ptz(),
            ir = camera.supports_ir(),
            streams = camera.config().streams.len(),
            "Camera registered"
        );
    }

    if config.server.relay.enabled() {
        configure_relay(&config).await?;
    } else {
        info!("Relay API not configured, skipping path setup");
    }

    let shutdown = CancellationToken::new();

    let nonces = Arc::new(NonceCache::default());
    nonces.start_sweep(NONCE_SWEEP_INTERVAL);

    HealthChecker::new(
        Arc::clone(&registry),
        DEFAULT_HEALTH_INTERVAL,
        shutdown.clone(),
    )
    .start();

    let base = base_url(config.server.onvif_port);
    if config.server.discovery {
        let responder = Responder::new(&config.server.device_name, &base);
        info!(uuid = responder.device_uuid(), "Starting WS-Discovery responder");
        responder
            .start(shutdown.clone())
            .context("failed to start WS-Discovery")?;
    }

    let state = Arc::new(GatewayState::new(
        &config.server,
        Arc::clone(&registry),
        Arc::clone(&nonces),
        Arc::new(DisabledTrigger),
    ));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.onvif_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("ONVIF server listening on {}", addr);

    let server_token = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    });

    let exited_early = tokio::select! {
        joined = &mut server => Some(joined),
        received = wait_for_signal() => {
            info!("Received {}, shutting down", received?);
            None
        }
    };
    shutdown.cancel();
    stop_background(&registry, &nonces);

    let result = match exited_early {
        Some(Ok(Ok(()))) => Err(anyhow!("HTTP server stopped unexpectedly")),
        Some(Ok(Err(e))) => Err(anyhow!(e).context("HTTP server failed")),
        Some(Err(e)) => Err(anyhow!(e).context("HTTP server task failed")),
        None => {
            match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
                Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
                Ok(Ok(Err(e))) => error!("HTTP server error during shutdown: {}", e),
                Ok(Err(e)) => error!("HTTP server task failed: {}", e),
                Err(_) => warn!("Graceful shutdown timed out after {:?}", SHUTDOWN_GRACE),
            }
            Ok(())
        }
    };

    info!("Shutdown complete");
    result
}
