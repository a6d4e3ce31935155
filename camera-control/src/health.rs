//! Periodic camera reachability checks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::Registry;

pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Consecutive failed pings before a camera is marked unhealthy.
pub const FAILURE_THRESHOLD: u32 = 3;

pub struct HealthChecker {
    registry: Arc<Registry>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl HealthChecker {
    pub fn new(registry: Arc<Registry>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            registry,
            interval,
            shutdown,
        }
    }

    /// Spawn the check loop. It exits when the shutdown token is cancelled.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval = ?self.interval, "Health checker started");
            let mut failures = HashMap::new();
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        tracing::info!("Health checker stopped");
                        break;
                    }
                    _ = ticker.tick() => self.check_all(&mut failures).await,
                }
            }
        })
    }

    /// Ping every camera once, updating the failure counters.
    pub async fn check_all(&self, failures: &mut HashMap<String, u32>) {
        for camera in self.registry.list() {
            let name = camera.name().to_string();
            match camera.client().ping().await {
                Ok(()) => {
                    if failures.insert(name.clone(), 0).unwrap_or(0) > 0 {
                        tracing::info!(camera = %name, "Camera health check recovered");
                    }
                    if !camera.is_healthy() {
                        camera.set_healthy(true);
                        tracing::info!(camera = %name, "Camera marked healthy");
                    }
                }
                Err(e) => {
                    let count = failures.entry(name.clone()).or_insert(0);
                    *count += 1;
                    tracing::warn!(
                        camera = %name,
                        consecutive_failures = *count,
                        error = %e,
                        "Camera health check failed"
                    );
                    if *count >= FAILURE_THRESHOLD && camera.is_healthy() {
                        camera.set_healthy(false);
                        tracing::warn!(camera = %name, "Camera marked unhealthy");
                    }
                }
            }
        }
    }
}
