//! Session error types
//!
//! The full failure taxonomy of the coordination core. Every variant is
//! recoverable by user retry; none is fatal to the session. Duplicate
//! commits are deliberately *not* an error; see
//! [`CommitOutcome::AlreadySaving`](crate::workflows::CommitOutcome).

use stemma_core::{EntityKind, GatewayError, Key, StemmaError, SurfaceId};
use thiserror::Error;

/// Errors from session coordination operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A field value failed local validation; no request was sent.
    #[error("validation failed for '{field}': {message}")]
    Validation {
        /// The offending field tag
        field: String,
        /// What was wrong with the value
        message: String,
    },

    /// The store rejected the request (business-rule failure).
    #[error("save rejected: {message}")]
    Persistence {
        /// Store-provided rejection message
        message: String,
    },

    /// No response from the store; treated like a rejection for state
    /// purposes, with a generic message.
    #[error("service unreachable: {message}")]
    Transport {
        /// Transport-level description
        message: String,
    },

    /// Commit attempted while dependent surfaces remain open.
    #[error("cannot save while surfaces are open: {titles:?}")]
    SurfacesStillOpen {
        /// Titles of the surfaces blocking the commit
        titles: Vec<String>,
    },

    /// A second surface of a one-per-owner kind was requested.
    #[error("a {kind} surface is already open for {owner}")]
    SurfaceAlreadyOpen {
        /// The surface kind
        kind: EntityKind,
        /// The owner both surfaces would edit
        owner: Key,
    },

    /// A surface handle that this registry never issued.
    #[error("unknown surface {surface}")]
    UnknownSurface {
        /// The unrecognized handle
        surface: SurfaceId,
    },

    /// The action is not available from this surface (wrong scope, or its
    /// controls are locked by an open child surface).
    #[error("{kind} actions are not available from this surface")]
    ActionUnavailable {
        /// The kind the action targeted
        kind: EntityKind,
    },

    /// A field edit arrived while a save is in flight.
    #[error("a save is in flight; edits are disabled until it completes")]
    SaveInFlight,

    /// A dependent operation was attempted before its owner was saved.
    ///
    /// Callers normally never see this: the deferred-action path saves the
    /// owner first. It guards the request-building boundary itself.
    #[error("owner of {kind} has no assigned identifier yet")]
    OwnerUnassigned {
        /// The dependent kind whose request was refused
        kind: EntityKind,
    },

    /// Foundation-level failure.
    #[error(transparent)]
    Core(#[from] StemmaError),
}

impl From<GatewayError> for SessionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { message } => Self::Persistence { message },
            GatewayError::Unreachable { message } => Self::Transport { message },
        }
    }
}

/// Standard Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
