//! The Bytestream Manager (§4.7): per-connection facade driving the full negotiation state
//! machine, plus the process-wide per-connection singleton registry (§4.8).

use crate::config::BytestreamManagerConfig;
use crate::connection::XmppConnection;
use crate::digest::digest;
use crate::discovery::{DiscoveryGateway, SOCKS5_BYTESTREAMS_NS};
use crate::jid::Jid;
use crate::resolver::StreamHostResolver;
use crate::session::BytestreamSession;
use crate::socks5::{LocalSocks5Proxy, Socks5Client};
use crate::state::ProxyState;
use crate::stream_host::SessionId;
use crate::transport::{ActivateReply, ActivateRequest, BytestreamOffer, OfferReply};
use crate::util::error::{BytestreamError, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Per-connection singleton driving the bytestream negotiation protocol (§2, §4.7).
///
/// Holds only a `Weak` reference to the connection: the registry's `Arc<BytestreamManager>`
/// must not be what keeps a torn-down connection alive (§5, §9 "do not leak managers"). Every
/// operation that needs the live connection upgrades on demand and fails with `Canceled` if it
/// is gone.
pub struct BytestreamManager {
    connection: Weak<dyn XmppConnection>,
    discovery: DiscoveryGateway,
    state: ProxyState,
    local_proxy: Arc<LocalSocks5Proxy>,
    config: parking_lot::RwLock<BytestreamManagerConfig>,
    service_enabled: AtomicBool,
    inflight_sessions: parking_lot::Mutex<HashSet<SessionId>>,
}

impl BytestreamManager {
    fn new(connection: Arc<dyn XmppConnection>, config: BytestreamManagerConfig) -> Self {
        let discovery = DiscoveryGateway::new(connection.discovery());
        let local_proxy = Arc::new(LocalSocks5Proxy::new(config.local_proxy_bind_addr));
        let state = ProxyState::new(config.proxy_prioritization_enabled);

        Self {
            connection: Arc::downgrade(&connection),
            discovery,
            state,
            local_proxy,
            config: parking_lot::RwLock::new(config),
            service_enabled: AtomicBool::new(true),
            inflight_sessions: parking_lot::Mutex::new(HashSet::new()),
        }
    }

    /// Look up (or create) the single manager for `connection` (§4.8, invariant #1 in §3).
    pub fn get_or_create(connection: Arc<dyn XmppConnection>) -> Arc<BytestreamManager> {
        REGISTRY.get_or_create(connection)
    }

    /// Look up (or create) the manager with a non-default starting configuration. Only has
    /// effect the first time a given connection is seen; subsequent calls return the existing
    /// singleton regardless of the config passed.
    pub fn get_or_create_with_config(
        connection: Arc<dyn XmppConnection>,
        config: BytestreamManagerConfig,
    ) -> Arc<BytestreamManager> {
        REGISTRY.get_or_create_with_config(connection, config)
    }

    /// Upgrade the weak connection handle. Fails with `Canceled` once the embedder has torn down
    /// the connection this manager was created for.
    fn connection(&self) -> Result<Arc<dyn XmppConnection>> {
        self.connection.upgrade().ok_or(BytestreamError::Canceled)
    }

    pub fn announce_local_stream_host(&self) -> bool {
        self.config.read().announce_local_stream_host
    }

    pub fn set_announce_local_stream_host(&self, enabled: bool) {
        self.config.write().announce_local_stream_host = enabled;
    }

    pub fn proxy_prioritization_enabled(&self) -> bool {
        self.state.prioritization_enabled()
    }

    pub fn set_proxy_prioritization_enabled(&self, enabled: bool) {
        self.config.write().proxy_prioritization_enabled = enabled;
        self.state.set_prioritization_enabled(enabled);
    }

    pub fn is_service_enabled(&self) -> bool {
        self.service_enabled.load(Ordering::Acquire)
    }

    /// Stop advertising the SOCKS5-bytestreams feature through the connection's own disco#info
    /// (§6).
    pub fn disable_service(&self) {
        self.service_enabled.store(false, Ordering::Release);
        if let Ok(connection) = self.connection() {
            connection.set_feature_advertised(SOCKS5_BYTESTREAMS_NS, false);
        }
    }

    pub fn enable_service(&self) {
        self.service_enabled.store(true, Ordering::Release);
        if let Ok(connection) = self.connection() {
            connection.set_feature_advertised(SOCKS5_BYTESTREAMS_NS, true);
        }
    }

    /// Drive the full negotiation of §4.7 for `target`, returning the live duplex byte stream on
    /// success. `session_id` is auto-generated when omitted.
    pub async fn establish_session(
        &self,
        target: Jid,
        session_id: Option<SessionId>,
    ) -> Result<BytestreamSession> {
        let sid = session_id.unwrap_or_else(SessionId::generate);
        if sid.is_empty() {
            return Err(BytestreamError::Config(
                "session id must not be empty".to_string(),
            ));
        }

        {
            let mut inflight = self.inflight_sessions.lock();
            if !inflight.insert(sid.clone()) {
                return Err(BytestreamError::SessionIdInUse(sid));
            }
        }

        let timeout = self.config.read().session_timeout;
        let result = match tokio::time::timeout(timeout, self.establish_session_inner(&target, &sid, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(BytestreamError::Timeout),
        };

        self.inflight_sessions.lock().remove(&sid);
        result
    }

    async fn establish_session_inner(
        &self,
        target: &Jid,
        sid: &SessionId,
        deadline: tokio::time::Duration,
    ) -> Result<BytestreamSession> {
        tracing::debug!(%target, %sid, "establish_session: starting");

        let connection = self.connection()?;
        let announce_local = self.announce_local_stream_host();
        if announce_local && !self.local_proxy.is_running() {
            self.local_proxy.start().await?;
        }

        let local_jid = connection.local_jid().clone();
        let resolver = StreamHostResolver {
            discovery: &self.discovery,
            state: &self.state,
            local_jid: &local_jid,
            service_jid: connection.service_jid(),
            local_proxy: announce_local.then_some(self.local_proxy.as_ref()),
            announce_local_stream_host: announce_local,
        };

        let hosts = resolver.resolve_hosts(target).await?;
        tracing::debug!(count = hosts.len(), "establish_session: resolved host list");

        let dig = digest(sid, &local_jid, target);
        let has_local_host = hosts.iter().any(|h| h.jid == local_jid);
        // `_local_transfer` removes the registration on drop — on every early return below, on
        // the remote-host branch once it falls out of scope, and (critically) if the outer
        // `establish_session` timeout cancels this whole future mid-flight, which no amount of
        // explicit `remove_transfer` calls on the return paths below could catch (§5).
        let _local_transfer = if has_local_host {
            self.local_proxy.add_transfer(dig.clone());
            Some(self.local_proxy.guard_transfer(dig.clone()))
        } else {
            None
        };

        let offer = BytestreamOffer {
            session_id: sid.clone(),
            hosts: hosts.clone(),
        };
        let transport = connection.transport();
        let reply = transport.send_offer(target, offer).await?;

        let used_jid = match reply {
            OfferReply::Error(stanza_error) => {
                return Err(BytestreamError::RemoteRejected(stanza_error));
            }
            OfferReply::Used(used) => used.used_jid,
        };

        let used_host = match hosts.iter().find(|h| h.jid == used_jid) {
            Some(host) => host.clone(),
            None => return Err(BytestreamError::UnknownUsedHost { reported: used_jid }),
        };

        let is_local = used_host.jid == local_jid;

        if is_local {
            tracing::debug!(%used_jid, "establish_session: target used our local stream host");
            let socket = self.local_proxy.socket_for(&dig, deadline).await?;
            return Ok(BytestreamSession::new(socket));
        }

        // The target chose a remote host; the pending local transfer (if any, via
        // `_local_transfer`) is no longer needed and is dropped along with the rest of this
        // function's locals once it returns.

        tracing::debug!(%used_jid, "establish_session: connecting to remote proxy");
        let socket = Socks5Client::connect(&used_host, &dig, deadline).await?;

        let activate_reply = transport
            .send_activate(
                &used_jid,
                ActivateRequest {
                    session_id: sid.clone(),
                    target: target.clone(),
                },
            )
            .await?;

        match activate_reply {
            ActivateReply::Error(stanza_error) => {
                Err(BytestreamError::RemoteError(stanza_error))
            }
            ActivateReply::Ok => {
                if self.state.prioritization_enabled() {
                    self.state.record_success(used_jid);
                }
                Ok(BytestreamSession::new(socket))
            }
        }
    }
}

/// Pointer identity of an `Arc<dyn XmppConnection>`, used as the registry key (§4.8).
fn connection_identity(connection: &Arc<dyn XmppConnection>) -> usize {
    Arc::as_ptr(connection) as *const () as usize
}

struct ManagerRegistry {
    entries: parking_lot::Mutex<Vec<(Weak<dyn XmppConnection>, Arc<BytestreamManager>)>>,
}

impl ManagerRegistry {
    fn new() -> Self {
        Self {
            entries: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn get_or_create(&self, connection: Arc<dyn XmppConnection>) -> Arc<BytestreamManager> {
        self.get_or_create_with_config(connection, BytestreamManagerConfig::default())
    }

    fn get_or_create_with_config(
        &self,
        connection: Arc<dyn XmppConnection>,
        config: BytestreamManagerConfig,
    ) -> Arc<BytestreamManager> {
        let key = connection_identity(&connection);
        let mut entries = self.entries.lock();
        entries.retain(|(weak, _)| weak.strong_count() > 0);

        for (weak, manager) in entries.iter() {
            if let Some(existing) = weak.upgrade() {
                if connection_identity(&existing) == key {
                    return manager.clone();
                }
            }
        }

        let manager = Arc::new(BytestreamManager::new(connection.clone(), config));
        entries.push((Arc::downgrade(&connection), manager.clone()));
        manager
    }
}

static REGISTRY: Lazy<ManagerRegistry> = Lazy::new(ManagerRegistry::new);
