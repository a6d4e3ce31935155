use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to bind discovery socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to join multicast group {group}: {source}")]
    JoinMulticast {
        group: std::net::Ipv4Addr,
        #[source]
        source: std::io::Error,
    },
}
