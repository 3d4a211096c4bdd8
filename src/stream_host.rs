//! Stream-host and session-id value types shared across discovery, resolution and negotiation.

use crate::jid::Jid;
use std::fmt;

/// A non-empty opaque session identifier, unique among the currently-live sessions on a
/// connection (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a caller-supplied session id. Empty ids are rejected at the manager boundary
    /// (`BytestreamError::Config`), not here, since this type has no `Result`-returning
    /// constructor the rest of the crate could rely on without importing the error module.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generate a fresh, practically-unique session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        SessionId::new(raw)
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        SessionId::new(raw)
    }
}

/// A candidate the target may connect to: `(jid, address, port)` (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHost {
    pub jid: Jid,
    pub address: String,
    pub port: u16,
}

impl StreamHost {
    pub fn new(jid: Jid, address: impl Into<String>, port: u16) -> Self {
        Self {
            jid,
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for StreamHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.jid, self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_ids_are_non_empty_and_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
