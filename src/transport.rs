//! The narrow seam between this crate and the embedding XMPP stack.
//!
//! Stanza routing, IQ ID generation, retries and XML (de)serialization are the embedder's job —
//! see §1/§6/§9 ("Mockable collaborators"). This module only defines the handful of
//! request/response shapes the manager needs to drive the state machine in §4.7, and the
//! `Transport` trait real code implements against a live XMPP connection (and tests implement
//! against a scripted queue).

use crate::jid::Jid;
use crate::stream_host::{SessionId, StreamHost};
use async_trait::async_trait;

/// A standard XMPP stanza error condition, carried opaquely through this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StanzaError {
    pub condition: String,
    pub text: Option<String>,
}

impl StanzaError {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            text: None,
        }
    }

    pub fn with_text(condition: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            text: Some(text.into()),
        }
    }
}

impl std::fmt::Display for StanzaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} ({text})", self.condition),
            None => write!(f, "{}", self.condition),
        }
    }
}

/// The offer stanza the initiator sends to the target: `sid`, mode, and the ordered host list.
#[derive(Debug, Clone)]
pub struct BytestreamOffer {
    pub session_id: SessionId,
    pub hosts: Vec<StreamHost>,
}

/// The target's reply to an offer: either it rejects, or it names the host it used.
#[derive(Debug, Clone)]
pub enum OfferReply {
    Used(UsedHostReply),
    Error(StanzaError),
}

#[derive(Debug, Clone)]
pub struct UsedHostReply {
    pub session_id: SessionId,
    pub used_jid: Jid,
}

/// The activation request the initiator sends to a remote proxy it used.
#[derive(Debug, Clone)]
pub struct ActivateRequest {
    pub session_id: SessionId,
    pub target: Jid,
}

#[derive(Debug, Clone)]
pub enum ActivateReply {
    Ok,
    Error(StanzaError),
}

/// The messaging transport collaborator: everything this crate needs to emit the two outbound
/// IQs of the bytestream negotiation and read back the target's/proxy's reply.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the stream-host offer to `target` and await its reply.
    async fn send_offer(&self, target: &Jid, offer: BytestreamOffer) -> crate::Result<OfferReply>;

    /// Send the activation request to the remote proxy `used` and await its reply.
    async fn send_activate(&self, used: &Jid, request: ActivateRequest)
    -> crate::Result<ActivateReply>;
}
