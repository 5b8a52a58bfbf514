//! Child-surface registry and commit guard
//!
//! Tracks the secondary editing surfaces a session has spawned. Handles are
//! arena indices; the registry never holds a reference to a live UI
//! control. The commit guard is what turns "committing the root while a
//! dependent is mid-edit elsewhere" from a silent race into a visible,
//! user-reportable precondition.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use stemma_core::{EntityKind, Key, SurfaceId};

/// One spawned child surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceHandle {
    /// The dependent kind the surface edits.
    pub kind: EntityKind,
    /// The owner key the surface was opened against.
    pub opened_against_owner: Key,
    /// Title shown in guard messages.
    pub title: String,
    /// Whether the surface is still open.
    pub open: bool,
}

/// Verdict of the commit guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// No open surfaces; the commit may proceed.
    Ok,
    /// Open surfaces block the commit; no request may be issued.
    Blocked(Vec<String>),
}

/// Arena of child-surface handles for one session.
///
/// Indices are never reused within a session: a closed handle's slot stays
/// occupied (marked closed) so stale [`SurfaceId`]s cannot alias a newer
/// surface.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    arena: Vec<SurfaceHandle>,
}

impl SurfaceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly spawned surface and hand out its handle.
    ///
    /// For one-per-owner kinds, a second open surface matching
    /// `(kind, owner)` is rejected and nothing is registered.
    pub fn open(
        &mut self,
        kind: EntityKind,
        owner: Key,
        title: impl Into<String>,
    ) -> Result<SurfaceId> {
        if kind.singleton_surface() {
            let duplicate = self
                .arena
                .iter()
                .any(|handle| handle.open && handle.kind == kind && handle.opened_against_owner == owner);
            if duplicate {
                tracing::warn!(%kind, %owner, "rejected duplicate surface");
                return Err(SessionError::SurfaceAlreadyOpen { kind, owner });
            }
        }

        let id = SurfaceId::new(self.arena.len() as u32);
        self.arena.push(SurfaceHandle {
            kind,
            opened_against_owner: owner,
            title: title.into(),
            open: true,
        });
        tracing::info!(%kind, %owner, surface = %id, "surface opened");
        Ok(id)
    }

    /// Record that a surface has closed.
    ///
    /// Called by the surface itself on explicit close, or by the feedback
    /// dispatcher immediately after a successful commit is relayed. Closing
    /// an already-closed handle is a no-op, since feedback may be redelivered.
    pub fn notify_closed(&mut self, surface: SurfaceId) -> Result<()> {
        let handle = self
            .arena
            .get_mut(surface.index() as usize)
            .ok_or(SessionError::UnknownSurface { surface })?;
        if handle.open {
            handle.open = false;
            tracing::info!(kind = %handle.kind, %surface, "surface closed");
        } else {
            tracing::debug!(%surface, "surface already closed");
        }
        Ok(())
    }

    /// Check whether a root commit may proceed.
    ///
    /// Returns [`GuardVerdict::Blocked`] with the open surfaces' titles if
    /// any remain open; the caller must not issue any network call in that
    /// case.
    pub fn guard_commit(&self) -> GuardVerdict {
        let titles: Vec<String> = self
            .arena
            .iter()
            .filter(|handle| handle.open)
            .map(|handle| handle.title.clone())
            .collect();
        if titles.is_empty() {
            GuardVerdict::Ok
        } else {
            GuardVerdict::Blocked(titles)
        }
    }

    /// The handle behind a surface ID, if the registry issued it.
    pub fn handle(&self, surface: SurfaceId) -> Option<&SurfaceHandle> {
        self.arena.get(surface.index() as usize)
    }

    /// Whether any surface of `kind` is still open.
    pub fn has_open(&self, kind: EntityKind) -> bool {
        self.arena.iter().any(|handle| handle.open && handle.kind == kind)
    }

    /// Titles of all currently open surfaces.
    pub fn open_titles(&self) -> Vec<String> {
        self.arena
            .iter()
            .filter(|handle| handle.open)
            .map(|handle| handle.title.clone())
            .collect()
    }

    /// Number of surfaces still open.
    pub fn open_count(&self) -> usize {
        self.arena.iter().filter(|handle| handle.open).count()
    }
}
