//! SOCKS5 handshake machinery (§4.2, §4.3, §6): the client side that speaks to a remote stream
//! host, and the local mini-server that accepts inbound connections for locally-advertised hosts.

pub mod client;
pub mod local_proxy;
pub mod wire;

pub use client::Socks5Client;
pub use local_proxy::LocalSocks5Proxy;
