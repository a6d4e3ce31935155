//! HTTP client for the camera's `cmd.cgi` control interface.

use std::sync::Arc;
use std::time::Duration;

use config_manager::CameraConfig;
use digest_transport::{DigestTransport, CHALLENGE_SWEEP_INTERVAL, CHALLENGE_TTL};
use reqwest::{Client, Request, Response, StatusCode};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::CameraError;

/// Timeout for every camera request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Snapshots larger than this are rejected.
pub const MAX_SNAPSHOT_SIZE: usize = 10 * 1024 * 1024;

/// At most this much of an error body is kept.
const MAX_ERROR_BODY: usize = 1024 * 1024;

const ALLOWED_PREFIXES: &[&str] = &["move ", "video ", "property ", "alarm "];

#[derive(Serialize)]
struct CommandRequest<'a> {
    exec: &'a str,
}

/// Control client for a single camera.
///
/// Requests go through a [`DigestTransport`] when the camera has both a
/// username and a password configured, and through a plain client otherwise.
#[derive(Debug)]
pub struct CameraClient {
    base_url: String,
    client: Client,
    digest: Option<Arc<DigestTransport>>,
}

impl CameraClient {
    pub fn new(config: &CameraConfig) -> Result<Self, CameraError> {
        Self::with_base_url(
            format!("http://{}:{}", config.host, config.http_port),
            config.credentials(),
        )
    }

    /// Client for an explicit `http://host:port` base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: Option<(&str, &str)>,
    ) -> Result<Self, CameraError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let digest = credentials
            .map(|(user, pass)| Arc::new(DigestTransport::new(client.clone(), user, pass)));

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            digest,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start the digest challenge sweep, if this client authenticates.
    pub fn start_challenge_sweep(&self) -> Option<JoinHandle<()>> {
        self.digest
            .as_ref()
            .map(|d| d.start_sweep(CHALLENGE_SWEEP_INTERVAL, CHALLENGE_TTL))
    }

    /// Stop background work owned by this client.
    pub fn shutdown(&self) {
        if let Some(digest) = &self.digest {
            digest.shutdown();
        }
    }

    async fn execute(&self, request: Request) -> Result<Response, CameraError> {
        match &self.digest {
            Some(digest) => Ok(digest.execute(request).await?),
            None => Ok(self.client.execute(request).await?),
        }
    }

    /// Send a raw control command.
    ///
    /// Only commands starting with `move `, `video `, `property ` or `alarm `
    /// are transmitted.
    pub async fn send_command(&self, command: &str) -> Result<(), CameraError> {
        if !ALLOWED_PREFIXES.iter().any(|p| command.starts_with(p)) {
            return Err(CameraError::CommandNotAllowed(command.to_string()));
        }

        let request = self
            .client
            .post(format!("{}/cgi-bin/cmd.cgi?port=socket", self.base_url))
            .json(&CommandRequest { exec: command })
            .build()?;

        let response = self.execute(request).await?;
        let status = response.status();
        if status != StatusCode::OK {
            let (body, _) = read_limited(response, MAX_ERROR_BODY).await?;
            return Err(CameraError::UnexpectedStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        tracing::debug!(camera = %self.base_url, command, "Camera command accepted");
        Ok(())
    }

    /// Move to an absolute native position.
    ///
    /// pan 0-355 degrees, tilt 0-180 degrees (0 looks up), speed 1-9.
    pub async fn ptz_move(&self, pan: i32, tilt: i32, speed: i32) -> Result<(), CameraError> {
        check_range("pan", pan, 0, 355)?;
        check_range("tilt", tilt, 0, 180)?;
        check_range("speed", speed, 1, 9)?;
        self.send_command(&format!("move {} {} {}", pan, tilt, speed))
            .await
    }

    /// Stop PTZ movement. The firmware reads speed 0 as stop.
    pub async fn ptz_stop(&self) -> Result<(), CameraError> {
        self.send_command("move 0 0 0").await
    }

    /// Reachability check. Any HTTP response counts as alive.
    pub async fn ping(&self) -> Result<(), CameraError> {
        let request = self.client.get(format!("{}/", self.base_url)).build()?;
        self.execute(request).await?;
        Ok(())
    }

    /// Fetch a JPEG snapshot.
    pub async fn snapshot(&self) -> Result<Vec<u8>, CameraError> {
        let request = self
            .client
            .get(format!("{}/cgi-bin/get_jpeg.cgi", self.base_url))
            .build()?;
        let response = self.execute(request).await?;

        if response.status() != StatusCode::OK {
            return Err(CameraError::UnexpectedStatus {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }

        let (data, truncated) = read_limited(response, MAX_SNAPSHOT_SIZE).await?;
        if truncated {
            return Err(CameraError::SnapshotTooLarge {
                limit: MAX_SNAPSHOT_SIZE,
            });
        }
        Ok(data)
    }
}

fn check_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<(), CameraError> {
    if value < min || value > max {
        return Err(CameraError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Read at most `limit` bytes. The flag is set when more data was available.
async fn read_limited(mut response: Response, limit: usize) -> Result<(Vec<u8>, bool), CameraError> {
    let mut data = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - data.len();
        if chunk.len() > room {
            data.extend_from_slice(&chunk[..room]);
            return Ok((data, true));
        }
        data.extend_from_slice(&chunk);
    }
    Ok((data, false))
}
