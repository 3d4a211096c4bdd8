//! Ambient configuration surface for the bytestream manager (§6, §4.7).

use std::net::SocketAddr;
use tokio::time::Duration;

/// Configuration for a single `BytestreamManager`. Constructed once per connection and shared
/// via `Arc`, mirroring the teacher's `SessionPoolConfig` passed into `Client::with_pool_config`.
#[derive(Debug, Clone)]
pub struct BytestreamManagerConfig {
    /// Whether to advertise the initiator's own local SOCKS5 proxy as a stream host (default
    /// true, §4.7).
    pub announce_local_stream_host: bool,
    /// Whether a previously-successful remote proxy is moved to the front of the offered list
    /// on subsequent attempts (default true, §4.6).
    pub proxy_prioritization_enabled: bool,
    /// Overall deadline for a single `establish_session` call (§5).
    pub session_timeout: Duration,
    /// Bind address for the local SOCKS5 mini-server. Port 0 requests an ephemeral port.
    pub local_proxy_bind_addr: SocketAddr,
}

impl Default for BytestreamManagerConfig {
    fn default() -> Self {
        Self {
            announce_local_stream_host: true,
            proxy_prioritization_enabled: true,
            session_timeout: Duration::from_secs(30),
            local_proxy_bind_addr: "0.0.0.0:0".parse().expect("static address"),
        }
    }
}
