//! Minimal structural JID value type.
//!
//! JID *parsing* (nodeprep/resourceprep, full RFC 7622 validation) is an external concern — see
//! §1/§6 of the spec this crate implements — so this type only does enough structural work to
//! let the manager compare, hash, and classify addresses. An embedder with a richer JID type is
//! expected to convert to/from `Jid` at the boundary.

use std::fmt;

/// The three JID shapes the bytestream core distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JidKind {
    /// `domain` — a server or component, no local part.
    DomainBare,
    /// `user@domain` — a bare user address, no resource.
    Bare,
    /// `user@domain/resource` — a full address bound to one client.
    EntityFull,
}

/// An opaque, totally-ordered messaging entity identifier.
///
/// Equality and ordering are defined over the normalized (lowercased) string form, matching the
/// external collaborator's behavior this crate assumes but does not itself implement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Jid(String);

impl Jid {
    /// Construct a `Jid` from its string form. Does not validate JID grammar beyond lowercasing
    /// for normalized comparison.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain part of the JID (everything between `@` and `/`, or the whole string if
    /// neither is present).
    pub fn domain(&self) -> &str {
        let after_at = match self.0.find('@') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0[..],
        };
        match after_at.find('/') {
            Some(idx) => &after_at[..idx],
            None => after_at,
        }
    }

    /// The bare JID (`user@domain` or `domain`), dropping any resource.
    pub fn bare(&self) -> Jid {
        match self.0.find('/') {
            Some(idx) => Jid(self.0[..idx].to_string()),
            None => self.clone(),
        }
    }

    pub fn kind(&self) -> JidKind {
        let has_local = self.0.find('@').is_some_and(|idx| {
            let domain_part = &self.0[idx + 1..];
            !domain_part.is_empty() && idx > 0
        });
        let has_resource = self.0.find('/').is_some();
        match (has_local, has_resource) {
            (false, _) => JidKind::DomainBare,
            (true, true) => JidKind::EntityFull,
            (true, false) => JidKind::Bare,
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Jid {
    fn from(raw: &str) -> Self {
        Jid::new(raw)
    }
}

impl From<String> for Jid {
    fn from(raw: String) -> Self {
        Jid::new(raw)
    }
}
