//! WS-Discovery responder.
//!
//! Listens on the ONVIF multicast group and answers every Probe with a
//! ProbeMatch that points clients at the gateway's device service.

mod error;
mod probe;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use error::DiscoveryError;
pub use probe::{parse_probe, ProbeHeader};

pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const DISCOVERY_PORT: u16 = 3702;

/// Receive deadline; bounds how long shutdown can go unnoticed.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

const RECV_BUFFER_SIZE: usize = 8192;

pub struct Responder {
    device_uuid: String,
    xaddrs: String,
    scopes: Vec<String>,
    metadata_version: u32,
}

impl Responder {
    pub fn new(device_name: &str, base_url: &str) -> Self {
        Self {
            device_uuid: device_uuid(device_name),
            xaddrs: format!("{}/onvif/device_service", base_url.trim_end_matches('/')),
            scopes: vec![
                "onvif://www.onvif.org/type/video_encoder".to_string(),
                "onvif://www.onvif.org/type/ptz".to_string(),
                format!("onvif://www.onvif.org/hardware/{device_name}"),
                format!("onvif://www.onvif.org/name/{device_name}"),
            ],
            metadata_version: 1,
        }
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    pub fn xaddrs(&self) -> &str {
        &self.xaddrs
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Builds a ProbeMatch answering the message `relates_to`.
    pub fn build_probe_match(&self, relates_to: &str) -> String {
        probe::render_probe_match(
            &Uuid::new_v4().to_string(),
            relates_to,
            &self.device_uuid,
            &self.scopes,
            &self.xaddrs,
            self.metadata_version,
        )
    }

    /// Returns the response for a datagram, or `None` if it is not a Probe.
    pub fn handle_datagram(&self, data: &[u8]) -> Option<String> {
        let header = parse_probe(data)?;
        if !header.is_probe() {
            return None;
        }
        Some(self.build_probe_match(&header.message_id))
    }

    /// Binds the multicast listener and spawns the receive loop.
    pub fn start(self, shutdown: CancellationToken) -> Result<JoinHandle<()>, DiscoveryError> {
        let socket = bind_multicast()?;
        info!(
            "WS-Discovery responder started on {}:{}",
            MULTICAST_GROUP, DISCOVERY_PORT
        );
        Ok(Arc::new(self).serve(Arc::new(socket), shutdown))
    }

    /// Runs the receive loop on an already bound socket.
    pub fn serve(
        self: Arc<Self>,
        socket: Arc<UdpSocket>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                if shutdown.is_cancelled() {
                    break;
                }

                let received = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    r = tokio::time::timeout(READ_TIMEOUT, socket.recv_from(&mut buf)) => r,
                };

                let (len, peer) = match received {
                    Err(_elapsed) => continue,
                    Ok(Err(e)) => {
                        warn!("WS-Discovery read error: {}", e);
                        continue;
                    }
                    Ok(Ok(r)) => r,
                };

                let data = buf[..len].to_vec();
                let responder = self.clone();
                let socket = socket.clone();
                tokio::spawn(async move {
                    responder.respond(&socket, &data, peer).await;
                });
            }
            info!("WS-Discovery responder stopped");
        })
    }

    async fn respond(&self, socket: &UdpSocket, data: &[u8], peer: SocketAddr) {
        let Some(response) = self.handle_datagram(data) else {
            return;
        };
        debug!("Received WS-Discovery Probe from {}", peer);

        match socket.send_to(response.as_bytes(), peer).await {
            Ok(_) => debug!("Sent ProbeMatch to {}", peer),
            Err(e) => warn!("Failed to send WS-Discovery response to {}: {}", peer, e),
        }
    }
}

/// Stable endpoint identity: the same device name always maps to the same UUID.
pub fn device_uuid(device_name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, device_name.as_bytes()).to_string()
}

fn bind_multicast() -> Result<UdpSocket, DiscoveryError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::Bind)?;
    socket.set_reuse_address(true).map_err(DiscoveryError::Bind)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DISCOVERY_PORT);
    socket.bind(&addr.into()).map_err(DiscoveryError::Bind)?;
    socket.set_nonblocking(true).map_err(DiscoveryError::Bind)?;

    let udp = UdpSocket::from_std(socket.into()).map_err(DiscoveryError::Bind)?;
    udp.join_multicast_v4(MULTICAST_GROUP, Ipv4Addr::UNSPECIFIED)
        .map_err(|source| DiscoveryError::JoinMulticast {
            group: MULTICAST_GROUP,
            source,
        })?;
    Ok(udp)
}
