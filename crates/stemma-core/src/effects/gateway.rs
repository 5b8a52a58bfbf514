//! Persistence gateway effect interface
//!
//! The store that actually executes create/update/delete/reorder requests is
//! an external collaborator. The session issues one request at a time per
//! entity, suspends at this boundary, and resumes in a success or failure
//! continuation. The gateway returns canonical entity state, never echoes of
//! the optimistic values the surface sent.

use crate::entity::{EntityKind, FieldMap};
use crate::identifiers::Key;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A create-or-update request for one record.
///
/// `id == None` means create; the reply carries the store-assigned key.
/// A dependent request must always carry its owner's key; callers uphold
/// the lifecycle rule that owners are saved first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// What kind of record is being saved.
    pub kind: EntityKind,
    /// Existing key for updates, `None` for creates.
    pub id: Option<Key>,
    /// Owning root's key, for dependent kinds.
    pub owner: Option<Key>,
    /// Field values to persist.
    pub fields: FieldMap,
}

impl SaveRequest {
    /// Request creating or updating a root record.
    pub fn root(kind: EntityKind, id: Option<Key>, fields: FieldMap) -> Self {
        Self {
            kind,
            id,
            owner: None,
            fields,
        }
    }

    /// Request creating or updating a dependent owned by `owner`.
    pub fn dependent(kind: EntityKind, id: Option<Key>, owner: Key, fields: FieldMap) -> Self {
        Self {
            kind,
            id,
            owner: Some(owner),
            fields,
        }
    }
}

/// Canonical outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveReply {
    /// The record's durable key (newly assigned for creates).
    pub id: Key,
    /// Canonical field values as the store holds them now.
    pub canonical_fields: FieldMap,
}

/// One lookup/typeahead candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The candidate record's key.
    pub id: Key,
    /// Display label.
    pub label: String,
}

/// Failure modes of the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum GatewayError {
    /// The store responded and rejected the request (business-rule failure).
    #[error("rejected: {message}")]
    Rejected {
        /// Store-provided rejection message
        message: String,
    },

    /// No response was received; the store may be unreachable.
    #[error("service unreachable: {message}")]
    Unreachable {
        /// Transport-level description
        message: String,
    },
}

impl GatewayError {
    /// Create a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

/// Pure trait for persistence operations.
///
/// Consumed by the session core; implemented by the surrounding application
/// (and by the scripted gateway in `stemma-testkit`).
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Create or update one record, returning its canonical state.
    async fn create_or_update(&self, request: SaveRequest) -> Result<SaveReply, GatewayError>;

    /// Delete one record.
    async fn remove(&self, kind: EntityKind, id: Key) -> Result<(), GatewayError>;

    /// Persist a new display order for an owner's dependents of one kind.
    async fn reorder(
        &self,
        kind: EntityKind,
        owner: Key,
        ordered_ids: Vec<Key>,
    ) -> Result<(), GatewayError>;

    /// Look up candidate records for typeahead assistance.
    async fn list_candidates(
        &self,
        kind: EntityKind,
        filter: &str,
    ) -> Result<Vec<Candidate>, GatewayError>;
}
