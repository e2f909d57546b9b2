//! Type definitions shared by subspaces, sections and groups

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a subspace. Globally unique and never zero.
pub type SubspaceId = u64;

/// Identifier of a section, local to its subspace
pub type SectionId = u32;

/// Identifier of a user group, local to its subspace
pub type GroupId = u32;

/// The root section every subspace owns. It is its own parent.
pub const ROOT_SECTION_ID: SectionId = 0;

/// The default group every subspace owns. It implicitly contains every user.
pub const DEFAULT_GROUP_ID: GroupId = 0;

/// First ID handed out by the global subspace counter
pub const FIRST_SUBSPACE_ID: SubspaceId = 1;

/// First ID handed out by a per-subspace section or group counter
pub const FIRST_LOCAL_ID: u32 = 1;

/// Textual sentinel used by partial updates to leave a field untouched
pub const DO_NOT_MODIFY: &str = "[do-not-modify]";

/// Block time supplied by the host, in milliseconds since the Unix epoch.
///
/// Never generated internally: every mutation that records a time receives
/// it from the caller so that replicas stay deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from milliseconds since epoch
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Get milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// The zero timestamp is never a valid creation time
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account address of a user, owner, creator or treasury.
///
/// The wrapper does not validate on construction: well-formedness is checked
/// by the host-provided [`AddressValidator`](super::address::AddressValidator)
/// on every path that stores an address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Address(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes used when the address is part of a storage key
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Rebuild an address from key bytes
    pub fn from_key_bytes(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().map(|s| Address(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}

/// Policy applied when deleting a section or a group that still has content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletePolicy {
    /// Refuse to delete a section with child sections or groups, or a group with members
    #[default]
    Reject,
    /// Delete the entity together with everything it contains
    Cascade,
}

/// Resolve a textual field of a raw update: the sentinel means "keep".
pub(crate) fn field_update(value: &str) -> Option<String> {
    if value == DO_NOT_MODIFY {
        None
    } else {
        Some(value.to_string())
    }
}
