//! Proxy blacklist and priority cache (§4.6) — per-manager memory carried across repeated
//! `establish_session` calls on the same connection.

use crate::jid::Jid;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Default)]
struct Inner {
    blacklist: HashSet<Jid>,
    last_success: Option<Jid>,
}

/// The non-SOCKS5 blacklist and last-successful-proxy cache, guarded by a single lock since
/// they are read and written together during resolution (§5: "single-writer-visibility update").
pub struct ProxyState {
    inner: RwLock<Inner>,
    prioritization_enabled: std::sync::atomic::AtomicBool,
}

impl ProxyState {
    pub fn new(prioritization_enabled: bool) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            prioritization_enabled: std::sync::atomic::AtomicBool::new(prioritization_enabled),
        }
    }

    /// True if `jid` was previously classified `NotSocks5` and must not be probed again.
    pub fn is_blacklisted(&self, jid: &Jid) -> bool {
        self.inner.read().blacklist.contains(jid)
    }

    /// Record that `jid` failed SOCKS5-proxy classification. Monotonic: never removed (invariant
    /// #2, §3).
    pub fn blacklist(&self, jid: Jid) {
        self.inner.write().blacklist.insert(jid);
    }

    /// Record a successful negotiation through the remote proxy `jid`, for future prioritization.
    /// Callers only invoke this for remote-proxy wins — see §9's resolved open question: a
    /// local-proxy win never reaches this method.
    pub fn record_success(&self, jid: Jid) {
        self.inner.write().last_success = Some(jid);
    }

    pub fn last_success(&self) -> Option<Jid> {
        self.inner.read().last_success.clone()
    }

    pub fn prioritization_enabled(&self) -> bool {
        self.prioritization_enabled
            .load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn set_prioritization_enabled(&self, enabled: bool) {
        self.prioritization_enabled
            .store(enabled, std::sync::atomic::Ordering::Release);
    }
}
