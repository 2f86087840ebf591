//! # Identifier Types
//!
//! Small copy value types used as keys across the registry, the catalog, and
//! the collaborator traits. Both identifiers are opaque to the core: the host
//! chooses owner identities, the registry mints connection identities.

/// Stable identity of a registered connection. Minted by the registry, used
/// as the arena key and as the catalog primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identity of the party that owns a connection and its sandboxed storage.
/// Also used to derive the name of the owner's sandbox directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u64);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
