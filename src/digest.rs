//! The SOCKS5 rendezvous digest (§4.1).
//!
//! `digest(sid, init, tgt)` is a pure function: SHA-1 over the UTF-8 concatenation of the three
//! inputs (no separator), lowercase hex. Both the initiator (when building the SOCKS5 CONNECT
//! request) and the local proxy (when matching an inbound CONNECT to a pending transfer) compute
//! the exact same value independently.

use crate::jid::Jid;
use crate::stream_host::SessionId;
use sha1::{Digest as _, Sha1};

/// 40 lowercase hex characters — the SHA-1 digest used as the SOCKS5 domain-name address.
pub fn digest(session_id: &SessionId, initiator: &Jid, target: &Jid) -> String {
    let mut hasher = Sha1::new();
    hasher.update(session_id.as_str().as_bytes());
    hasher.update(initiator.as_str().as_bytes());
    hasher.update(target.as_str().as_bytes());
    let bytes = hasher.finalize();

    let mut out = String::with_capacity(40);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
