//! Client for the external media relay's path configuration API.
//!
//! The gateway never touches media. At startup it makes the relay's paths
//! match the configured streams, using create, then delete and recreate when
//! the relay still holds a path from a previous run.

mod command;
mod error;
mod path;

pub use command::{build_transcode_command, source_url};
pub use error::RelayError;
pub use path::{path_name, PathConfig};

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::time::Instant;

/// Timeout for each relay API call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between readiness probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    client: Client,
    poll_interval: Duration,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Poll the global config endpoint until it answers 200 or `timeout` elapses.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), RelayError> {
        let url = format!("{}/v3/config/global/get", self.base_url);
        let deadline = Instant::now() + timeout;

        loop {
            let last_error = match self.client.get(&url).send().await {
                Ok(response) if response.status() == StatusCode::OK => return Ok(()),
                Ok(response) => format!("unexpected status code: {}", response.status().as_u16()),
                Err(e) => e.to_string(),
            };
            tracing::debug!(error = %last_error, "Relay API not ready yet");

            let now = Instant::now();
            if now >= deadline {
                return Err(RelayError::NotReady {
                    timeout,
                    last_error,
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Create or replace a path.
    ///
    /// Only the relay's "path already exists" answer triggers delete and a
    /// single re-add. Any other failure is returned as is.
    pub async fn configure_path(&self, name: &str, config: &PathConfig) -> Result<(), RelayError> {
        match self.add_path(name, config).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_path_exists() => {
                tracing::debug!(path = name, "Path exists on relay, replacing it");
                self.delete_path(name)
                    .await
                    .map_err(|e| RelayError::DeleteExisting {
                        path: name.to_string(),
                        source: Box::new(e),
                    })?;
                self.add_path(name, config)
                    .await
                    .map_err(|e| RelayError::Recreate {
                        path: name.to_string(),
                        source: Box::new(e),
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn add_path(&self, name: &str, config: &PathConfig) -> Result<(), RelayError> {
        let response = self
            .client
            .post(format!("{}/v3/config/paths/add/{}", self.base_url, name))
            .json(config)
            .send()
            .await?;
        check_status(response, true).await
    }

    async fn delete_path(&self, name: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .delete(format!("{}/v3/config/paths/delete/{}", self.base_url, name))
            .send()
            .await?;
        check_status(response, false).await
    }
}

async fn check_status(response: Response, api_errors: bool) -> Result<(), RelayError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    if api_errors {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) {
            if !parsed.error.is_empty() {
                return Err(RelayError::Api {
                    status: status.as_u16(),
                    message: parsed.error,
                });
            }
        }
    }
    Err(RelayError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct FakeRelay {
        paths: Arc<Mutex<HashMap<String, PathConfig>>>,
        deletes: Arc<Mutex<u32>>,
        reject_names: Arc<Mutex<Vec<String>>>,
    }

    async fn add(
        State(relay): State<FakeRelay>,
        Path(name): Path<String>,
        Json(config): Json<PathConfig>,
    ) -> (AxumStatus, Json<serde_json::Value>) {
        if relay.reject_names.lock().contains(&name) {
            return (
                AxumStatus::BAD_REQUEST,
                Json(serde_json::json!({"error": "invalid path name"})),
            );
        }
        let mut paths = relay.paths.lock();
        if paths.contains_key(&name) {
            return (
                AxumStatus::BAD_REQUEST,
                Json(serde_json::json!({"error": "path already exists"})),
            );
        }
        paths.insert(name, config);
        (AxumStatus::OK, Json(serde_json::json!({})))
    }

    async fn remove(State(relay): State<FakeRelay>, Path(name): Path<String>) -> AxumStatus {
        *relay.deletes.lock() += 1;
        match relay.paths.lock().remove(&name) {
            Some(_) => AxumStatus::OK,
            None => AxumStatus::NOT_FOUND,
        }
    }

    async fn spawn_relay() -> (SocketAddr, FakeRelay) {
        let relay = FakeRelay::default();
        let app = Router::new()
            .route("/v3/config/global/get", get(|| async { "{}" }))
            .route("/v3/config/paths/add/{*name}", post(add))
            .route("/v3/config/paths/delete/{*name}", delete(remove))
            .with_state(relay.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, relay)
    }

    #[tokio::test]
    async fn test_configure_path_is_idempotent() {
        let (addr, relay) = spawn_relay().await;
        let client = RelayClient::new(format!("http://{}", addr)).unwrap();
        let config = PathConfig::on_demand("ffmpeg -i rtsp://cam/hd");

        client.configure_path("cam/hd", &config).await.unwrap();
        let after_first = relay.paths.lock().clone();

        client.configure_path("cam/hd", &config).await.unwrap();
        let after_second = relay.paths.lock().clone();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second["cam/hd"], config);
        assert_eq!(*relay.deletes.lock(), 1);
    }

    #[tokio::test]
    async fn test_mode_change_replaces_path() {
        let (addr, relay) = spawn_relay().await;
        let client = RelayClient::new(format!("http://{}", addr)).unwrap();

        client
            .configure_path("cam/hd", &PathConfig::proxy("rtsp://cam/hd"))
            .await
            .unwrap();
        let transcode = PathConfig::on_demand("ffmpeg");
        client.configure_path("cam/hd", &transcode).await.unwrap();

        assert_eq!(relay.paths.lock()["cam/hd"], transcode);
    }

    #[tokio::test]
    async fn test_other_errors_surface_unmodified() {
        let (addr, relay) = spawn_relay().await;
        relay.reject_names.lock().push("bad".to_string());
        let client = RelayClient::new(format!("http://{}", addr)).unwrap();

        let err = client
            .configure_path("bad", &PathConfig::on_demand("ffmpeg"))
            .await
            .unwrap_err();
        match err {
            RelayError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid path name");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(*relay.deletes.lock(), 0);
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let (addr, _) = spawn_relay().await;
        let client = RelayClient::new(format!("http://{}", addr)).unwrap();
        client.wait_ready(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_ready_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RelayClient::new(format!("http://{}", addr))
            .unwrap()
            .with_poll_interval(Duration::from_millis(20));
        let err = client
            .wait_ready(Duration::from_millis(100))
            .await
            .unwrap_err();
        match err {
            RelayError::NotReady { last_error, .. } => assert!(!last_error.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_path_exists_detection() {
        let exists = RelayError::Api {
            status: 400,
            message: "path already exists".into(),
        };
        assert!(exists.is_path_exists());

        let other_status = RelayError::Api {
            status: 409,
            message: "path already exists".into(),
        };
        assert!(!other_status.is_path_exists());

        let plain = RelayError::UnexpectedStatus {
            status: 400,
            body: "path already exists".into(),
        };
        assert!(!plain.is_path_exists());
    }
}
