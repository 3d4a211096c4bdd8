//! Common test utilities: scripted `ServiceDiscovery`/`Transport` mocks and connection glue.

use async_trait::async_trait;
use socks5_bytestream::{
    ActivateReply, ActivateRequest, BytestreamOffer, DiscoItem, Identity, Jid, OfferReply,
    ServiceDiscovery, StanzaError, Transport, XmppConnection,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{Duration, sleep};

/// Canned service-discovery responses keyed by target JID.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockDiscovery {
    pub supported_features: HashMap<Jid, HashSet<String>>,
    pub items: HashMap<Jid, Vec<DiscoItem>>,
    pub identities: HashMap<Jid, Vec<Identity>>,
    pub stream_host_info: HashMap<Jid, (String, u16)>,
    pub stream_host_info_errors: HashSet<Jid>,
    pub identities_calls: AsyncMutex<Vec<Jid>>,
}

#[async_trait]
impl ServiceDiscovery for MockDiscovery {
    async fn supports(&self, jid: &Jid, feature: &str) -> socks5_bytestream::Result<bool> {
        Ok(self
            .supported_features
            .get(jid)
            .is_some_and(|features| features.contains(feature)))
    }

    async fn items(&self, jid: &Jid) -> socks5_bytestream::Result<Vec<DiscoItem>> {
        Ok(self.items.get(jid).cloned().unwrap_or_default())
    }

    async fn identities(&self, jid: &Jid) -> socks5_bytestream::Result<Vec<Identity>> {
        self.identities_calls.lock().await.push(jid.clone());
        Ok(self.identities.get(jid).cloned().unwrap_or_default())
    }

    async fn stream_host_info(&self, jid: &Jid) -> socks5_bytestream::Result<(String, u16)> {
        if self.stream_host_info_errors.contains(jid) {
            return Err(socks5_bytestream::BytestreamError::Config(format!(
                "no stream-host-info for {jid}"
            )));
        }
        self.stream_host_info
            .get(jid)
            .cloned()
            .ok_or_else(|| socks5_bytestream::BytestreamError::Config(format!("unknown item {jid}")))
    }
}

/// One scripted outcome per IQ the transport is asked to send, plus a record of what it saw.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockTransport {
    pub offer_reply: AsyncMutex<Option<OfferReply>>,
    pub activate_reply: AsyncMutex<Option<ActivateReply>>,
    pub offers_sent: AsyncMutex<Vec<(Jid, BytestreamOffer)>>,
    pub activations_sent: AsyncMutex<Vec<(Jid, ActivateRequest)>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_offer(
        &self,
        target: &Jid,
        offer: BytestreamOffer,
    ) -> socks5_bytestream::Result<OfferReply> {
        self.offers_sent
            .lock()
            .await
            .push((target.clone(), offer));
        self.offer_reply
            .lock()
            .await
            .clone()
            .ok_or_else(|| {
                socks5_bytestream::BytestreamError::Config("no scripted offer reply".to_string())
            })
    }

    async fn send_activate(
        &self,
        used: &Jid,
        request: ActivateRequest,
    ) -> socks5_bytestream::Result<ActivateReply> {
        self.activations_sent
            .lock()
            .await
            .push((used.clone(), request));
        self.activate_reply
            .lock()
            .await
            .clone()
            .ok_or_else(|| {
                socks5_bytestream::BytestreamError::Config("no scripted activate reply".to_string())
            })
    }
}

#[allow(dead_code)]
pub fn stanza_error(condition: &str) -> StanzaError {
    StanzaError::new(condition)
}

/// A scripted connection pairing a local/service JID with the two mock collaborators above.
pub struct MockConnection {
    pub local_jid: Jid,
    pub service_jid: Jid,
    pub transport: Arc<MockTransport>,
    pub discovery: Arc<MockDiscovery>,
    pub advertised_features: parking_lot::Mutex<HashSet<String>>,
}

impl MockConnection {
    #[allow(dead_code)]
    pub fn new(local_jid: impl Into<Jid>, service_jid: impl Into<Jid>) -> Self {
        Self {
            local_jid: local_jid.into(),
            service_jid: service_jid.into(),
            transport: Arc::new(MockTransport::default()),
            discovery: Arc::new(MockDiscovery::default()),
            advertised_features: parking_lot::Mutex::new(HashSet::new()),
        }
    }
}

impl XmppConnection for MockConnection {
    fn local_jid(&self) -> &Jid {
        &self.local_jid
    }

    fn service_jid(&self) -> &Jid {
        &self.service_jid
    }

    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn discovery(&self) -> Arc<dyn ServiceDiscovery> {
        self.discovery.clone()
    }

    fn set_feature_advertised(&self, feature: &str, enabled: bool) {
        let mut features = self.advertised_features.lock();
        if enabled {
            features.insert(feature.to_string());
        } else {
            features.remove(feature);
        }
    }
}

/// Poll `condition` until it is true or `timeout` elapses.
#[allow(dead_code)]
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    false
}

#[allow(dead_code)]
pub async fn is_port_listening(addr: std::net::SocketAddr) -> bool {
    tokio::net::TcpStream::connect(addr).await.is_ok()
}
