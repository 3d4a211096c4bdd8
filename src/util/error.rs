use crate::jid::Jid;
use crate::stream_host::SessionId;
use crate::transport::StanzaError;
use thiserror::Error;

/// Where in the SOCKS5 handshake a protocol violation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks5Stage {
    Greeting,
    Request,
    Reply,
}

impl std::fmt::Display for Socks5Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Socks5Stage::Greeting => "greeting",
            Socks5Stage::Request => "request",
            Socks5Stage::Reply => "reply",
        };
        f.write_str(s)
    }
}

/// The bytestream negotiation error taxonomy (§7). A single currency for every failure mode
/// this crate can produce.
#[derive(Error, Debug)]
pub enum BytestreamError {
    #[error("{jid} does not support the {feature} feature")]
    FeatureNotSupported { feature: String, jid: Jid },

    #[error("no SOCKS5 proxies available for this session")]
    NoProxiesAvailable,

    #[error("target rejected the stream offer: {0}")]
    RemoteRejected(StanzaError),

    #[error("target reported an unknown used host: {reported}")]
    UnknownUsedHost { reported: Jid },

    #[error("proxy activation failed: {0}")]
    RemoteError(StanzaError),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("SOCKS5 protocol error at {at}: {detail}")]
    Protocol { at: Socks5Stage, detail: String },

    #[error("operation timed out")]
    Timeout,

    #[error("operation canceled")]
    Canceled,

    #[error("session id already in use: {0}")]
    SessionIdInUse(SessionId),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BytestreamError>;
