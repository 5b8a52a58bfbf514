//! Feedback channel between a child surface and its opener
//!
//! After its own save is confirmed, and never speculatively, a child surface
//! reports canonical state back to the session that spawned it. The
//! contract is one handler per entity kind on the opener side
//! ([`FeedbackSink`]), addressed through the [`FeedbackRouter`] by session
//! identity rather than by walking a live object graph. Sinks are held
//! weakly: a closed opener is observed as unreachable, and the channel
//! itself is never retried.

use crate::error::{Result, SessionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stemma_core::{EntityKind, EntityRef, FieldMap, SessionId, SortKey, SurfaceId};

/// Canonical state a child surface pushes back into its opener.
///
/// Carries server-confirmed values only, never partial or optimistic ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    /// The committed dependent (always assigned).
    pub entity: EntityRef,
    /// The root that owns it.
    pub owner: EntityRef,
    /// Position in the owner's ordered list.
    pub sort_key: SortKey,
    /// Preferred flag as committed.
    pub preferred: bool,
    /// Group key for preferred exclusivity.
    pub group_key: Option<String>,
    /// Row title for display.
    pub title: String,
    /// Canonical field values.
    pub fields: FieldMap,
}

/// What became of a feedback delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackDisposition {
    /// The opener applied the message.
    Delivered,
    /// The opener is closed or outside the trust boundary; the child must
    /// fall back to its own canonical state.
    OpenerUnreachable,
}

/// The per-kind handler contract every opener implements.
///
/// Each handler patches the opener's in-memory state with the canonical
/// values, repositions the row through the list merger where the kind is
/// ordered, releases the originating surface's registry entry, and
/// re-enables the root controls that were locked for it.
pub trait FeedbackSink {
    /// An event surface committed.
    fn on_event_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()>;
    /// A name surface committed.
    fn on_name_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()>;
    /// A citation surface committed.
    fn on_citation_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage)
        -> Result<()>;
    /// A family-links surface committed.
    fn on_family_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()>;
    /// A child-links surface committed.
    fn on_child_link_committed(
        &mut self,
        surface: SurfaceId,
        message: &FeedbackMessage,
    ) -> Result<()>;
    /// A picture surface committed.
    fn on_picture_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage)
        -> Result<()>;
    /// An address surface committed.
    fn on_address_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage)
        -> Result<()>;
}

/// Dispatch a message to the handler named by its entity kind.
pub fn deliver_to_sink(
    sink: &mut dyn FeedbackSink,
    surface: SurfaceId,
    message: &FeedbackMessage,
) -> Result<()> {
    match message.entity.kind {
        EntityKind::Event => sink.on_event_committed(surface, message),
        EntityKind::Name => sink.on_name_committed(surface, message),
        EntityKind::Citation => sink.on_citation_committed(surface, message),
        EntityKind::FamilyLink => sink.on_family_committed(surface, message),
        EntityKind::ChildLink => sink.on_child_link_committed(surface, message),
        EntityKind::Picture => sink.on_picture_committed(surface, message),
        EntityKind::Address => sink.on_address_committed(surface, message),
        kind @ (EntityKind::Person | EntityKind::Family) => Err(SessionError::ActionUnavailable {
            kind,
        }),
    }
}

/// One registered delivery endpoint.
///
/// Implementations hold their session weakly and report
/// [`FeedbackDisposition::OpenerUnreachable`] when it is gone.
#[async_trait]
pub trait FeedbackPort: Send + Sync {
    /// Deliver one message for the given originating surface.
    async fn deliver(
        &self,
        surface: SurfaceId,
        message: FeedbackMessage,
    ) -> Result<FeedbackDisposition>;
}

/// Looks up feedback endpoints by session identity.
#[derive(Default)]
pub struct FeedbackRouter {
    ports: async_lock::Mutex<HashMap<SessionId, std::sync::Arc<dyn FeedbackPort>>>,
}

impl FeedbackRouter {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the endpoint for a session.
    pub async fn register(&self, session: SessionId, port: std::sync::Arc<dyn FeedbackPort>) {
        self.ports.lock().await.insert(session, port);
        tracing::debug!(%session, "feedback endpoint registered");
    }

    /// Drop a session's endpoint, e.g. when its surface closes.
    pub async fn unregister(&self, session: SessionId) {
        self.ports.lock().await.remove(&session);
        tracing::debug!(%session, "feedback endpoint unregistered");
    }

    /// Deliver a message to `opener`'s endpoint.
    ///
    /// An unregistered or dead opener yields
    /// [`FeedbackDisposition::OpenerUnreachable`]; no polling, no retry.
    pub async fn deliver(
        &self,
        opener: SessionId,
        surface: SurfaceId,
        message: FeedbackMessage,
    ) -> Result<FeedbackDisposition> {
        let port = self.ports.lock().await.get(&opener).cloned();
        match port {
            Some(port) => port.deliver(surface, message).await,
            None => {
                tracing::warn!(%opener, "no feedback endpoint for opener");
                Ok(FeedbackDisposition::OpenerUnreachable)
            }
        }
    }
}

impl std::fmt::Debug for FeedbackRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackRouter").finish_non_exhaustive()
    }
}
