//! Asynchronous workflows over a shared session
//!
//! Each workflow locks the session briefly on either side of a persistence
//! request and holds no lock across the await, so the surface's event loop
//! stays responsive while a save is outstanding. That is also what makes
//! the duplicate-submit guard observable: a second commit issued while one
//! is in flight finds the session in `Saving` and is ignored without a
//! gateway call.
//!
//! Ordering invariants upheld here, in sequence: the record save, then
//! pending reorders under the same save window, then feedback application
//! at the opener, then registry cleanup, then control re-enabling (the
//! latter three inside [`crate::Session::apply_feedback`]).

use crate::error::{Result, SessionError};
use crate::feedback::FeedbackDisposition;
use crate::intent::Intent;
use crate::registry::GuardVerdict;
use crate::session::{OpenedSurface, SessionState, SharedSession};
use stemma_core::{Candidate, EntityKind, EntityRef, Key, StemmaError};

/// Outcome of a dependent-action request.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The root was already assigned; the surface opened immediately with
    /// no side effects.
    Performed(OpenedSurface),
    /// The root had to be saved first; the parked action then resumed
    /// exactly once with the newly assigned key.
    ResumedAfterSave {
        /// The key the root save assigned.
        assigned: Key,
        /// An unconsumed earlier action this request displaced, if any.
        displaced: Option<Intent>,
        /// The surface the resumed action opened.
        opened: OpenedSurface,
    },
}

/// Outcome of a commit request.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The save went through.
    Saved {
        /// The record's key (newly assigned for first saves).
        id: Key,
        /// A deferred action that resumed after this save, if any.
        resumed: Option<OpenedSurface>,
        /// Feedback disposition when this session reports to an opener.
        feedback: Option<FeedbackDisposition>,
    },
    /// A save is already in flight; the duplicate request was ignored.
    AlreadySaving,
    /// Nothing was dirty; no request was issued.
    NothingToSave,
}

/// Request an operation on a dependent entity.
///
/// If the root is assigned the surface opens immediately. Otherwise the
/// intent is parked in the deferred slot, the root is saved through the
/// gateway, and the action resumes with the assigned key. On save failure
/// the root stays unassigned and the slot is left intact so the same action
/// can be retried.
pub async fn request_dependent_action(
    session: &SharedSession,
    intent: Intent,
) -> Result<ActionOutcome> {
    let (gateway, request, displaced) = {
        let mut guard = session.write().await;
        guard.admit_dependent_action(intent.kind())?;

        if guard.record().entity.is_assigned() {
            let opened = guard.open_for_intent(&intent)?;
            return Ok(ActionOutcome::Performed(opened));
        }

        let displaced = guard.defer(intent);
        guard.begin_save();
        let request = match guard.build_save_request() {
            Ok(request) => request,
            Err(err) => {
                guard.abort_save();
                return Err(err);
            }
        };
        (guard.gateway(), request, displaced)
    };

    let result = gateway.create_or_update(request).await;

    let mut guard = session.write().await;
    match result {
        Ok(reply) => {
            guard.apply_save_reply(&reply)?;
            let opened = guard.resume_deferred()?;
            Ok(ActionOutcome::ResumedAfterSave {
                assigned: reply.id,
                displaced,
                opened,
            })
        }
        Err(err) => {
            // Root stays unassigned; the parked action survives for retry.
            guard.abort_save();
            Err(err.into())
        }
    }
}

/// Explicitly save the session's record.
///
/// Refused while child surfaces are open; no request is issued in that
/// case. A duplicate request while a save is in flight is ignored, not
/// queued. On success: the record's key is assigned if this was a first
/// save, pending reorders persist under the same save window, the deferred
/// slot drains, and (for child sessions) canonical state is reported to
/// the opener.
pub async fn commit(session: &SharedSession) -> Result<CommitOutcome> {
    let (gateway, request) = {
        let mut guard = session.write().await;
        match guard.state() {
            SessionState::Saving => {
                tracing::debug!(session = %guard.id(), "duplicate commit ignored");
                return Ok(CommitOutcome::AlreadySaving);
            }
            SessionState::Clean => return Ok(CommitOutcome::NothingToSave),
            SessionState::Dirty => {}
        }
        if let GuardVerdict::Blocked(titles) = guard.registry().guard_commit() {
            tracing::warn!(session = %guard.id(), ?titles, "commit blocked by open surfaces");
            return Err(SessionError::SurfacesStillOpen { titles });
        }
        guard.begin_save();
        let request = match guard.build_save_request() {
            Ok(request) => request,
            Err(err) => {
                guard.abort_save();
                return Err(err);
            }
        };
        (guard.gateway(), request)
    };

    let result = gateway.create_or_update(request).await;

    let (resumed, relay, reply_id) = {
        let mut guard = session.write().await;
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                guard.abort_save();
                return Err(err.into());
            }
        };
        guard.apply_save_reply(&reply)?;
        let batch = match guard.reorder_batch() {
            Ok(batch) => batch,
            Err(err) => {
                guard.abort_save();
                return Err(err);
            }
        };
        if batch.is_empty() {
            let (resumed, relay) = guard.finish_save()?;
            (resumed, relay, reply.id)
        } else {
            drop(guard);
            for (kind, owner, ordered) in batch {
                if let Err(err) = gateway.reorder(kind, owner, ordered).await {
                    session.write().await.abort_save();
                    return Err(err.into());
                }
                session.write().await.mark_reorder_persisted(kind);
            }
            let mut guard = session.write().await;
            let (resumed, relay) = guard.finish_save()?;
            (resumed, relay, reply.id)
        }
    };

    let feedback = match relay {
        Some((link, message)) => {
            let router = session.read().await.router();
            let disposition = router.deliver(link.session, link.surface, message).await?;
            if disposition == FeedbackDisposition::OpenerUnreachable {
                // The opener may never see this commit. Our own state is
                // already canonical from the save reply; nothing to retry.
                tracing::warn!(opener = %link.session, "opener unreachable; feedback not delivered");
            }
            Some(disposition)
        }
        None => None,
    };

    Ok(CommitOutcome::Saved {
        id: reply_id,
        resumed,
        feedback,
    })
}

/// Delete a persisted dependent through the gateway, then drop its row.
///
/// On gateway failure the list is untouched and the error propagates for
/// user retry.
pub async fn remove_dependent(session: &SharedSession, entity: EntityRef) -> Result<()> {
    let (gateway, key) = {
        let guard = session.read().await;
        if guard.state() == SessionState::Saving {
            return Err(SessionError::SaveInFlight);
        }
        let key = entity.key().ok_or_else(|| {
            SessionError::Core(StemmaError::invalid("cannot remove an unsaved row"))
        })?;
        (guard.gateway(), key)
    };

    gateway.remove(entity.kind, key).await?;

    let mut guard = session.write().await;
    guard.drop_dependent_row(&entity);
    Ok(())
}

/// Typeahead assistance, passed through to the gateway unchanged.
pub async fn lookup_candidates(
    session: &SharedSession,
    kind: EntityKind,
    filter: &str,
) -> Result<Vec<Candidate>> {
    let gateway = session.read().await.gateway();
    Ok(gateway.list_candidates(kind, filter).await?)
}
