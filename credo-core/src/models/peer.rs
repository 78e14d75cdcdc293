//! Peer identity types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable identifier of a peer in the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an organisation a peer may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(pub String);

impl From<&str> for OrgId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a peer as pushed by roster updates.
///
/// Immutable once stored except for the organisation set, which roster sync
/// may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    /// Stable peer id.
    pub id: PeerId,
    /// Network address as reported by the transport layer.
    pub address: String,
    /// Organisation memberships.
    pub organisations: BTreeSet<OrgId>,
}

impl PeerIdentity {
    /// Build an identity with no organisation memberships.
    pub fn new(id: impl Into<PeerId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            organisations: BTreeSet::new(),
        }
    }

    /// Build an identity with the given organisation memberships.
    pub fn with_organisations<I>(id: impl Into<PeerId>, address: impl Into<String>, orgs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OrgId>,
    {
        Self {
            id: id.into(),
            address: address.into(),
            organisations: orgs.into_iter().map(Into::into).collect(),
        }
    }

    /// True when this peer shares at least one organisation with `orgs`.
    pub fn shares_organisation(&self, orgs: &BTreeSet<OrgId>) -> bool {
        self.organisations.intersection(orgs).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_organisation_on_overlap() {
        let a = PeerIdentity::with_organisations("a", "10.0.0.1", ["org1", "org2"]);
        let mine: BTreeSet<OrgId> = [OrgId::from("org2")].into_iter().collect();
        assert!(a.shares_organisation(&mine));
    }

    #[test]
    fn no_shared_organisation_on_disjoint_sets() {
        let a = PeerIdentity::with_organisations("a", "10.0.0.1", ["org1"]);
        let mine: BTreeSet<OrgId> = [OrgId::from("org9")].into_iter().collect();
        assert!(!a.shares_organisation(&mine));
        assert!(!PeerIdentity::new("b", "10.0.0.2").shares_organisation(&mine));
    }
}
