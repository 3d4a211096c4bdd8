//! The stream-host resolver (§4.5): feature check, candidate discovery, SOCKS5 classification
//! with blacklist caching, and local-first/priority-aware ordering.

use crate::discovery::{DiscoveryGateway, SOCKS5_BYTESTREAMS_NS};
use crate::jid::Jid;
use crate::socks5::LocalSocks5Proxy;
use crate::state::ProxyState;
use crate::stream_host::StreamHost;
use crate::util::error::{BytestreamError, Result};
use std::collections::HashSet;

/// Resolves the ordered candidate host list for one `establish_session` attempt. Borrows
/// everything it needs from the manager for the duration of a single call — it carries no state
/// of its own beyond the borrow.
pub struct StreamHostResolver<'a> {
    pub discovery: &'a DiscoveryGateway,
    pub state: &'a ProxyState,
    pub local_jid: &'a Jid,
    pub service_jid: &'a Jid,
    pub local_proxy: Option<&'a LocalSocks5Proxy>,
    pub announce_local_stream_host: bool,
}

impl<'a> StreamHostResolver<'a> {
    pub async fn resolve_hosts(&self, target: &Jid) -> Result<Vec<StreamHost>> {
        if !self
            .discovery
            .supports(target, SOCKS5_BYTESTREAMS_NS)
            .await?
        {
            return Err(BytestreamError::FeatureNotSupported {
                feature: "SOCKS5 Bytestream".to_string(),
                jid: target.clone(),
            });
        }

        let items = self.discovery.items(self.service_jid).await?;
        let mut seen = HashSet::new();
        let candidates: Vec<_> = items
            .into_iter()
            .filter(|item| seen.insert(item.jid.clone()))
            .collect();

        let mut remote_hosts = Vec::new();
        for item in candidates {
            if self.state.is_blacklisted(&item.jid) {
                tracing::debug!(jid = %item.jid, "resolver: skipping blacklisted candidate");
                continue;
            }

            let identities = match self.discovery.identities(&item.jid).await {
                Ok(identities) => identities,
                Err(e) => {
                    tracing::warn!(jid = %item.jid, error = %e, "resolver: identity probe failed, dropping candidate for this attempt");
                    continue;
                }
            };

            let is_socks5 = identities.iter().any(|id| id.is_socks5_proxy());
            if !is_socks5 {
                tracing::debug!(jid = %item.jid, "resolver: not a SOCKS5 proxy, blacklisting");
                self.state.blacklist(item.jid.clone());
                continue;
            }

            match self.discovery.stream_host_info(&item.jid).await {
                Ok((address, port)) => {
                    remote_hosts.push(StreamHost::new(item.jid.clone(), address, port));
                }
                Err(e) => {
                    // Transient fault (§9, resolved open question): not blacklisted.
                    tracing::warn!(jid = %item.jid, error = %e, "resolver: stream-host-info lookup failed, dropping candidate for this attempt");
                }
            }
        }

        if self.state.prioritization_enabled() {
            if let Some(last) = self.state.last_success() {
                if let Some(pos) = remote_hosts.iter().position(|h| h.jid == last) {
                    let preferred = remote_hosts.remove(pos);
                    remote_hosts.insert(0, preferred);
                }
            }
        }

        let mut hosts = Vec::new();
        if self.announce_local_stream_host {
            if let Some(proxy) = self.local_proxy {
                if let Some(port) = proxy.port() {
                    for addr in proxy.local_addresses() {
                        hosts.push(StreamHost::new(self.local_jid.clone(), addr, port));
                    }
                }
            }
        }
        hosts.extend(remote_hosts);

        if hosts.is_empty() {
            return Err(BytestreamError::NoProxiesAvailable);
        }

        Ok(hosts)
    }
}
