//! Core identifier types used across the Stemma platform
//!
//! This module provides the fundamental identifier types that uniquely
//! identify records, editing sessions, and child surfaces. Identifiers are
//! opaque newtypes; nothing in the coordination core ever holds a live
//! reference to a UI control.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-assigned key of a persisted record.
///
/// Keys are allocated by the persistence gateway on first successful save.
/// A record that has never been saved has no `Key` at all (see
/// [`RecordId::Unassigned`](crate::entity::RecordId)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(pub u64);

impl Key {
    /// Create a key from its raw store value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw store value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key-{}", self.0)
    }
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Key> for u64 {
    fn from(key: Key) -> Self {
        key.0
    }
}

/// Identifier of one editing session.
///
/// Feedback sinks are addressed by session identity, never by walking a live
/// object graph: a child surface remembers the `SessionId` of its opener and
/// looks the sink up at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SessionId> for Uuid {
    fn from(session_id: SessionId) -> Self {
        session_id.0
    }
}

/// Arena index of a child-surface handle inside one session's registry.
///
/// Surface IDs are only meaningful within the registry that issued them; a
/// removed handle's index is never reused during the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    /// Create a surface ID from its arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the arena index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}
