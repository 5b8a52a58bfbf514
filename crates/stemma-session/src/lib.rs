//! # Stemma Session
//!
//! The coordination core of a record editor: one [`Session`] per editing
//! surface, keeping a tree of independently persisted records consistent
//! while several surfaces are open at once.
//!
//! The moving parts, leaves first:
//!
//! - [`DeferredSlot`]: single-slot holder for an [`Intent`] awaiting a
//!   prerequisite root save, resumed exactly once after the save succeeds.
//! - [`SurfaceRegistry`]: arena of child-surface handles plus the commit
//!   guard that blocks a root save while dependents are mid-edit.
//! - [`FeedbackRouter`] / [`FeedbackSink`]: the typed callback contract a
//!   child surface invokes on its opener after a confirmed save, addressed
//!   by session identity.
//! - [`merge`]: the dependent-list merger keeping rows in stable
//!   sort-key order as feedback lands.
//! - [`preferred`]: exclusivity of the preferred flag within a group.
//! - [`Session`]: the state machine tying the above together.

pub mod behavior;
pub mod deferred;
pub mod error;
pub mod feedback;
pub mod intent;
pub mod merge;
pub mod preferred;
pub mod registry;
pub mod session;
pub mod workflows;

pub use behavior::{BehaviorTable, FieldBehavior, Normalize};
pub use deferred::{DeferredSlot, PendingAction};
pub use error::{Result, SessionError};
pub use feedback::{
    deliver_to_sink, FeedbackDisposition, FeedbackMessage, FeedbackPort, FeedbackRouter,
    FeedbackSink,
};
pub use intent::{surface_title, Intent};
pub use merge::{insertion_index, merge_ordered, merge_unordered, MergePosition};
pub use preferred::ClearOutcome;
pub use registry::{GuardVerdict, SurfaceHandle, SurfaceRegistry};
pub use session::{
    register_session, ChildSurfaceParams, OpenedSurface, OpenerLink, Session, SessionPort,
    SessionScope, SessionState, SharedSession,
};
pub use workflows::{ActionOutcome, CommitOutcome};
