//! The service-discovery collaborator (§4.4): "does X support feature F", "what are X's items",
//! "what are X's identities". This crate only adapts these three round trips; the cache, the
//! disco#info/disco#items XML, and stanza routing all live in the embedding application.

use crate::jid::Jid;
use async_trait::async_trait;

/// One `<item/>` returned by a disco#items query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoItem {
    pub jid: Jid,
    pub name: Option<String>,
    pub node: Option<String>,
}

/// One `<identity/>` returned by a disco#info query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub category: String,
    pub kind: String,
    pub name: Option<String>,
}

impl Identity {
    /// The identity XEP-0065 expects from a SOCKS5 bytestreams proxy.
    pub fn is_socks5_proxy(&self) -> bool {
        self.category == "proxy" && self.kind == "bytestreams"
    }
}

/// The feature namespace the target must advertise for SOCKS5 Bytestreams to be usable.
pub const SOCKS5_BYTESTREAMS_NS: &str = "http://jabber.org/protocol/bytestreams";

/// The external service-discovery collaborator this crate consumes (§4.4/§6).
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    async fn supports(&self, jid: &Jid, feature: &str) -> crate::Result<bool>;
    async fn items(&self, jid: &Jid) -> crate::Result<Vec<DiscoItem>>;
    async fn identities(&self, jid: &Jid) -> crate::Result<Vec<Identity>>;

    /// Fetch a candidate proxy's advertised `(address, port)` pair (the bytestreams GET).
    async fn stream_host_info(&self, jid: &Jid) -> crate::Result<(String, u16)>;
}

/// Thin adapter exposing the three §4.4 operations over a `ServiceDiscovery` collaborator.
/// Exists as a distinct type so the manager depends on a stable, narrow API even if the
/// underlying disco implementation grows unrelated methods.
pub struct DiscoveryGateway {
    inner: std::sync::Arc<dyn ServiceDiscovery>,
}

impl DiscoveryGateway {
    pub fn new(inner: std::sync::Arc<dyn ServiceDiscovery>) -> Self {
        Self { inner }
    }

    pub async fn supports(&self, jid: &Jid, feature: &str) -> crate::Result<bool> {
        self.inner.supports(jid, feature).await
    }

    pub async fn items(&self, jid: &Jid) -> crate::Result<Vec<DiscoItem>> {
        self.inner.items(jid).await
    }

    pub async fn identities(&self, jid: &Jid) -> crate::Result<Vec<Identity>> {
        self.inner.identities(jid).await
    }

    pub async fn stream_host_info(&self, jid: &Jid) -> crate::Result<(String, u16)> {
        self.inner.stream_host_info(jid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_recognizes_socks5_proxy() {
        let id = Identity {
            category: "proxy".into(),
            kind: "bytestreams".into(),
            name: None,
        };
        assert!(id.is_socks5_proxy());
    }

    #[test]
    fn identity_rejects_other_kinds() {
        let id = Identity {
            category: "proxy".into(),
            kind: "pubsub".into(),
            name: None,
        };
        assert!(!id.is_socks5_proxy());
    }
}
