//! Single-slot deferred-action queue
//!
//! Only one user-triggered action can be awaiting a root save at a time:
//! the surface disables the triggering controls while a save is outstanding.
//! The slot therefore holds at most one [`PendingAction`]. A new enqueue
//! overwrites unconditionally, but an overwrite of a non-empty slot is
//! surfaced to the caller and logged, never silently dropped.

use crate::intent::Intent;
use serde::{Deserialize, Serialize};
use stemma_core::EntityRef;

/// An intent parked until a prerequisite save completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// The reference that must become assigned before the intent can run.
    pub required: EntityRef,
    /// The action to resume once it is.
    pub intent: Intent,
}

/// The single-slot holder for a pending action.
#[derive(Debug, Default)]
pub struct DeferredSlot {
    slot: Option<PendingAction>,
}

impl DeferredSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an action, returning whatever unconsumed action it displaced.
    pub fn enqueue(&mut self, action: PendingAction) -> Option<PendingAction> {
        let displaced = self.slot.replace(action);
        if let Some(previous) = &displaced {
            tracing::warn!(
                displaced = ?previous.intent,
                "deferred slot overwritten before its action resumed"
            );
        }
        displaced
    }

    /// Take the pending action for execution. Empty slot is a no-op.
    ///
    /// Called exactly once per successful root save, after the root's
    /// identifier transition, so the resumed intent observes the assigned
    /// key.
    pub fn drain(&mut self) -> Option<PendingAction> {
        self.slot.take()
    }

    /// Whether an action is parked.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Look at the parked action without consuming it.
    pub fn peek(&self) -> Option<&PendingAction> {
        self.slot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stemma_core::EntityKind;

    fn action(intent: Intent) -> PendingAction {
        PendingAction {
            required: EntityRef::unassigned(EntityKind::Person),
            intent,
        }
    }

    #[test]
    fn drain_pops_exactly_once() {
        let mut slot = DeferredSlot::new();
        assert!(slot.drain().is_none());

        slot.enqueue(action(Intent::OpenFamilyEditor));
        assert!(!slot.is_empty());

        let drained = slot.drain().expect("parked action");
        assert_eq!(drained.intent, Intent::OpenFamilyEditor);
        assert!(slot.is_empty());
        assert!(slot.drain().is_none());
    }

    #[test]
    fn enqueue_overwrites_and_reports_displacement() {
        let mut slot = DeferredSlot::new();
        assert!(slot.enqueue(action(Intent::OpenFamilyEditor)).is_none());

        let displaced = slot
            .enqueue(action(Intent::OpenChildLinkEditor))
            .expect("displaced action");
        assert_eq!(displaced.intent, Intent::OpenFamilyEditor);

        let drained = slot.drain().expect("parked action");
        assert_eq!(drained.intent, Intent::OpenChildLinkEditor);
    }
}
