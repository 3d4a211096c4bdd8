//! §8 scenarios around the offer/reply half of negotiation: unsupported feature, no candidate
//! proxies, a rejected offer, and an unknown used-host report.

mod common;

use anyhow::Result;
use common::*;
use socks5_bytestream::{
    BytestreamError, BytestreamManager, DiscoItem, Identity, Jid, OfferReply, UsedHostReply,
};
use std::sync::Arc;

#[tokio::test]
async fn feature_not_supported_is_rejected_before_any_offer() -> Result<()> {
    let connection = Arc::new(MockConnection::new("alice@example.org/laptop", "example.org"));
    let manager = BytestreamManager::get_or_create(connection.clone() as Arc<dyn socks5_bytestream::XmppConnection>);

    let target = Jid::new("bob@example.net/phone");
    let err = manager
        .establish_session(target, None)
        .await
        .expect_err("target advertises nothing, feature check must fail first");

    assert!(matches!(err, BytestreamError::FeatureNotSupported { .. }));
    assert!(connection.transport.offers_sent.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn no_candidate_proxies_yields_no_proxies_available() -> Result<()> {
    let target = Jid::new("bob@example.net/phone");

    let mut features = std::collections::HashSet::new();
    features.insert(socks5_bytestream::discovery::SOCKS5_BYTESTREAMS_NS.to_string());
    let discovery = MockDiscovery {
        supported_features: [(target.clone(), features)].into_iter().collect(),
        items: [(Jid::new("example.org"), vec![])].into_iter().collect(),
        ..Default::default()
    };

    let connection = Arc::new(MockConnection {
        discovery: Arc::new(discovery),
        ..MockConnection::new("alice@example.org/laptop", "example.org")
    });
    let manager = BytestreamManager::get_or_create_with_config(
        connection.clone() as Arc<dyn socks5_bytestream::XmppConnection>,
        socks5_bytestream::BytestreamManagerConfig {
            announce_local_stream_host: false,
            ..Default::default()
        },
    );

    let err = manager
        .establish_session(target, None)
        .await
        .expect_err("empty item list and no local host must fail");
    assert!(matches!(err, BytestreamError::NoProxiesAvailable));
    Ok(())
}

#[tokio::test]
async fn remote_rejection_surfaces_as_remote_rejected() -> Result<()> {
    let target = Jid::new("bob@example.net/phone");
    let proxy_jid = Jid::new("proxy.example.org");

    let mut features = std::collections::HashSet::new();
    features.insert(socks5_bytestream::discovery::SOCKS5_BYTESTREAMS_NS.to_string());
    let discovery = MockDiscovery {
        supported_features: [(target.clone(), features)].into_iter().collect(),
        items: [(
            Jid::new("example.org"),
            vec![DiscoItem {
                jid: proxy_jid.clone(),
                name: None,
                node: None,
            }],
        )]
        .into_iter()
        .collect(),
        identities: [(
            proxy_jid.clone(),
            vec![Identity {
                category: "proxy".to_string(),
                kind: "bytestreams".to_string(),
                name: None,
            }],
        )]
        .into_iter()
        .collect(),
        stream_host_info: [(proxy_jid.clone(), ("198.51.100.1".to_string(), 7777))]
            .into_iter()
            .collect(),
        ..Default::default()
    };

    let connection = Arc::new(MockConnection {
        discovery: Arc::new(discovery),
        ..MockConnection::new("alice@example.org/laptop", "example.org")
    });
    *connection.transport.offer_reply.lock().await =
        Some(OfferReply::Error(stanza_error("not-acceptable")));

    let manager = BytestreamManager::get_or_create_with_config(
        connection.clone() as Arc<dyn socks5_bytestream::XmppConnection>,
        socks5_bytestream::BytestreamManagerConfig {
            announce_local_stream_host: false,
            ..Default::default()
        },
    );

    let err = manager
        .establish_session(target, None)
        .await
        .expect_err("scripted offer reply is an error");
    assert!(matches!(err, BytestreamError::RemoteRejected(_)));
    Ok(())
}

#[tokio::test]
async fn unknown_used_host_is_reported() -> Result<()> {
    let target = Jid::new("bob@example.net/phone");
    let proxy_jid = Jid::new("proxy.example.org");

    let mut features = std::collections::HashSet::new();
    features.insert(socks5_bytestream::discovery::SOCKS5_BYTESTREAMS_NS.to_string());
    let discovery = MockDiscovery {
        supported_features: [(target.clone(), features)].into_iter().collect(),
        items: [(
            Jid::new("example.org"),
            vec![DiscoItem {
                jid: proxy_jid.clone(),
                name: None,
                node: None,
            }],
        )]
        .into_iter()
        .collect(),
        identities: [(
            proxy_jid.clone(),
            vec![Identity {
                category: "proxy".to_string(),
                kind: "bytestreams".to_string(),
                name: None,
            }],
        )]
        .into_iter()
        .collect(),
        stream_host_info: [(proxy_jid.clone(), ("198.51.100.1".to_string(), 7777))]
            .into_iter()
            .collect(),
        ..Default::default()
    };

    let connection = Arc::new(MockConnection {
        discovery: Arc::new(discovery),
        ..MockConnection::new("alice@example.org/laptop", "example.org")
    });
    *connection.transport.offer_reply.lock().await = Some(OfferReply::Used(UsedHostReply {
        session_id: socks5_bytestream::SessionId::new("whatever"),
        used_jid: Jid::new("not-in-the-offer.example.org"),
    }));

    let manager = BytestreamManager::get_or_create_with_config(
        connection.clone() as Arc<dyn socks5_bytestream::XmppConnection>,
        socks5_bytestream::BytestreamManagerConfig {
            announce_local_stream_host: false,
            ..Default::default()
        },
    );

    let err = manager
        .establish_session(target, None)
        .await
        .expect_err("used jid was never offered");
    assert!(matches!(err, BytestreamError::UnknownUsedHost { .. }));
    Ok(())
}
