//! The per-connection collaborator bundle the manager needs (§1/§6): a stable identity to key
//! the manager registry on, plus handles to the two external collaborators (transport,
//! discovery) and the two JIDs (this connection's own address, and the service JID used for
//! items discovery).

use crate::discovery::ServiceDiscovery;
use crate::jid::Jid;
use crate::transport::Transport;
use std::sync::Arc;

/// What the embedding XMPP stack provides this crate. Implementations typically wrap a live
/// connection object; tests implement it over scripted collaborators (see `tests/common.rs`).
pub trait XmppConnection: Send + Sync + 'static {
    /// This connection's own (full) JID — the initiator address used in the digest and as the
    /// JID of any locally-advertised stream host.
    fn local_jid(&self) -> &Jid;

    /// The JID of the server-side service-discovery entity items are enumerated from (typically
    /// the user's own server).
    fn service_jid(&self) -> &Jid;

    fn transport(&self) -> Arc<dyn Transport>;

    fn discovery(&self) -> Arc<dyn ServiceDiscovery>;

    /// Update this connection's own published disco#info feature set. Used by
    /// `BytestreamManager::disable_service`/`enable_service` (§6) to add/remove the
    /// SOCKS5-bytestreams namespace from what this entity advertises to others.
    fn set_feature_advertised(&self, feature: &str, enabled: bool);
}
