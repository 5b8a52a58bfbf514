//! The editing-session coordinator
//!
//! A [`Session`] owns one root record, the registry of child surfaces it has
//! spawned, and the single-slot deferred-action queue. It drives the
//! `Clean → Dirty → Saving` machine, enforces the commit guard, and applies
//! feedback from child surfaces through the per-kind sink handlers.
//!
//! All methods here are synchronous state transitions; the suspension points
//! live in [`crate::workflows`], which locks a [`SharedSession`] briefly on
//! either side of each persistence request so the surface's event loop stays
//! responsive while a save is outstanding.
//!
//! ## Flow
//!
//! ```text
//! user action → resolve-or-defer → (root save) → surface opens
//!   child session → commit → gateway confirm → feedback → opener patches
//!   list → registry cleanup → controls unlock → root commit unblocked
//! ```

use crate::behavior::BehaviorTable;
use crate::deferred::{DeferredSlot, PendingAction};
use crate::error::{Result, SessionError};
use crate::feedback::{
    deliver_to_sink, FeedbackDisposition, FeedbackMessage, FeedbackPort, FeedbackRouter,
    FeedbackSink,
};
use crate::intent::{surface_title, Intent};
use crate::merge;
use crate::preferred::{self, ClearOutcome};
use crate::registry::SurfaceRegistry;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use stemma_core::{
    DependentRow, EntityKind, EntityRef, FieldValue, Key, PersistenceGateway, RootRecord,
    SaveReply, SaveRequest, SessionId, SortKey, StemmaError, SurfaceId,
};

/// A session shared with its event loop and feedback endpoints.
pub type SharedSession = Arc<async_lock::RwLock<Session>>;

/// Where the session is in its save cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No unsaved changes.
    Clean,
    /// Unsaved changes exist.
    Dirty,
    /// A save request is outstanding.
    Saving,
}

/// Link back to the session and surface handle that spawned this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenerLink {
    /// The opener's session identity.
    pub session: SessionId,
    /// The registry handle the opener issued for this surface.
    pub surface: SurfaceId,
}

/// Entry parameters of a session (see the child-spawning flow).
#[derive(Debug, Clone, Default)]
pub struct SessionScope {
    /// Present when this session was spawned as a child surface.
    pub opener: Option<OpenerLink>,
    /// Owning-parent link when the session edits a dependent record.
    pub parent: Option<(EntityKind, Key)>,
    /// Opened to edit exactly one sub-entity; sibling affordances are
    /// disabled.
    pub single_dependent: bool,
}

/// Everything a child surface needs to construct its own session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSurfaceParams {
    /// The dependent kind the surface edits.
    pub kind: EntityKind,
    /// Existing record to load, or `None` to create one.
    pub record: Option<Key>,
    /// The owning root's kind.
    pub owner_kind: EntityKind,
    /// The owning root's key, always assigned before a surface can spawn.
    pub owner_key: Key,
    /// The opener's session identity, for feedback.
    pub opener: SessionId,
    /// The registry handle the opener issued.
    pub surface: SurfaceId,
    /// Surface title.
    pub title: String,
}

/// A successfully spawned child surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedSurface {
    /// The handle registered for it.
    pub surface: SurfaceId,
    /// Construction parameters for the child session.
    pub child: ChildSurfaceParams,
}

/// The root-level coordinator for one editing surface.
pub struct Session {
    id: SessionId,
    scope: SessionScope,
    record: RootRecord,
    state: SessionState,
    registry: SurfaceRegistry,
    deferred: DeferredSlot,
    behaviors: BehaviorTable,
    locked: BTreeSet<EntityKind>,
    reorder_pending: BTreeSet<EntityKind>,
    gateway: Arc<dyn PersistenceGateway>,
    router: Arc<FeedbackRouter>,
}

impl Session {
    /// Open a session on a root record: loaded when `key` is given,
    /// otherwise a fresh unsaved record.
    pub fn new_root(
        kind: EntityKind,
        key: Option<Key>,
        gateway: Arc<dyn PersistenceGateway>,
        router: Arc<FeedbackRouter>,
    ) -> Result<Self> {
        if !kind.is_root() {
            return Err(SessionError::Core(StemmaError::invalid(format!(
                "{kind} is not a root kind"
            ))));
        }
        let record = match key {
            Some(key) => RootRecord::loaded(kind, key),
            None => RootRecord::unsaved(kind),
        };
        Ok(Self::from_record(record, SessionScope::default(), gateway, router))
    }

    /// Build a child session from the parameters its opener produced.
    pub fn child(
        params: &ChildSurfaceParams,
        gateway: Arc<dyn PersistenceGateway>,
        router: Arc<FeedbackRouter>,
    ) -> Self {
        let record = match params.record {
            Some(key) => RootRecord::loaded(params.kind, key),
            None => RootRecord::unsaved(params.kind),
        };
        let scope = SessionScope {
            opener: Some(OpenerLink {
                session: params.opener,
                surface: params.surface,
            }),
            parent: Some((params.owner_kind, params.owner_key)),
            single_dependent: true,
        };
        Self::from_record(record, scope, gateway, router)
    }

    /// Open a session over an already-populated record, e.g. one loaded
    /// with its dependent lists.
    pub fn from_record(
        record: RootRecord,
        scope: SessionScope,
        gateway: Arc<dyn PersistenceGateway>,
        router: Arc<FeedbackRouter>,
    ) -> Self {
        let behaviors = BehaviorTable::for_kind(record.entity.kind);
        let session = Self {
            id: SessionId::new(),
            scope,
            record,
            state: SessionState::Clean,
            registry: SurfaceRegistry::new(),
            deferred: DeferredSlot::new(),
            behaviors,
            locked: BTreeSet::new(),
            reorder_pending: BTreeSet::new(),
            gateway,
            router,
        };
        tracing::info!(session = %session.id, entity = %session.record.entity, "session opened");
        session
    }

    /// This session's identity.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current save-cycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The record under edit.
    pub fn record(&self) -> &RootRecord {
        &self.record
    }

    /// The child-surface registry.
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Whether an action is parked awaiting a root save.
    pub fn has_pending_action(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Whether the add/edit controls for `kind` are currently usable.
    pub fn is_control_enabled(&self, kind: EntityKind) -> bool {
        !self.locked.contains(&kind) && self.action_allowed(kind)
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Apply one field edit, validated and normalized through the behavior
    /// table.
    pub fn edit_field(&mut self, tag: &str, value: FieldValue) -> Result<()> {
        if self.state == SessionState::Saving {
            return Err(SessionError::SaveInFlight);
        }
        let value = self.behaviors.check(tag, value)?;
        self.record.fields.insert(tag.to_string(), value);
        self.mark_dirty("field edit");
        Ok(())
    }

    /// Rearrange the `kind` list into the given sequence.
    ///
    /// Renumbers every row and marks it changed; the new order persists on
    /// the next explicit root save, not now.
    pub fn reorder_dependents(&mut self, kind: EntityKind, ordered: &[EntityRef]) -> Result<()> {
        if !kind.is_ordered() {
            return Err(SessionError::Core(StemmaError::invalid(format!(
                "{kind} rows are not ordered"
            ))));
        }
        merge::apply_reorder(self.record.dependents_of_mut(kind), ordered)?;
        self.reorder_pending.insert(kind);
        self.mark_dirty("reorder");
        Ok(())
    }

    /// Make `entity` the preferred member of its group, clearing the rest.
    pub fn set_preferred(&mut self, entity: EntityRef) -> Result<()> {
        preferred::set_preferred(self.record.dependents_of_mut(entity.kind), &entity)?;
        self.mark_dirty("preferred change");
        Ok(())
    }

    /// Clear `entity`'s preferred flag; non-optional combinations revert.
    pub fn clear_preferred(&mut self, entity: EntityRef) -> Result<ClearOutcome> {
        let outcome =
            preferred::clear_preferred(self.record.dependents_of_mut(entity.kind), &entity)?;
        if outcome == ClearOutcome::Cleared {
            self.mark_dirty("preferred change");
        }
        Ok(outcome)
    }

    /// Record that a surface closed without committing.
    ///
    /// Its in-memory state is discarded by the embedding; no compensating
    /// action is taken on the owner.
    pub fn close_surface(&mut self, surface: SurfaceId) -> Result<()> {
        let kind = self
            .registry
            .handle(surface)
            .map(|handle| handle.kind)
            .ok_or(SessionError::UnknownSurface { surface })?;
        self.registry.notify_closed(surface)?;
        self.unlock_if_last(kind);
        Ok(())
    }

    /// Apply one feedback message from a child surface.
    ///
    /// Application order is fixed: patch and merge first, then release the
    /// registry entry, then unlock the root controls it held.
    pub fn apply_feedback(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()> {
        deliver_to_sink(self, surface, message)
    }

    // ------------------------------------------------------------------
    // Save-cycle transitions, driven by the workflows
    // ------------------------------------------------------------------

    pub(crate) fn gateway(&self) -> Arc<dyn PersistenceGateway> {
        Arc::clone(&self.gateway)
    }

    pub(crate) fn router(&self) -> Arc<FeedbackRouter> {
        Arc::clone(&self.router)
    }

    /// Check that a dependent action on `kind` may start now.
    pub(crate) fn admit_dependent_action(&self, kind: EntityKind) -> Result<()> {
        if !self.action_allowed(kind) || self.locked.contains(&kind) {
            return Err(SessionError::ActionUnavailable { kind });
        }
        if self.state == SessionState::Saving {
            return Err(SessionError::SaveInFlight);
        }
        Ok(())
    }

    /// Park an intent awaiting the root save, surfacing any displacement.
    pub(crate) fn defer(&mut self, intent: Intent) -> Option<Intent> {
        self.deferred
            .enqueue(PendingAction {
                required: self.record.entity,
                intent,
            })
            .map(|action| action.intent)
    }

    pub(crate) fn begin_save(&mut self) {
        self.set_state(SessionState::Saving);
    }

    /// The save failed or was aborted; unsaved changes remain.
    pub(crate) fn abort_save(&mut self) {
        self.set_state(SessionState::Dirty);
    }

    pub(crate) fn build_save_request(&self) -> Result<SaveRequest> {
        let kind = self.record.entity.kind;
        let fields = self.record.fields.clone();
        if kind.is_root() {
            Ok(SaveRequest::root(kind, self.record.entity.key(), fields))
        } else {
            // Dependent requests carry the owner's key; a child session is
            // only ever constructed with one.
            let (_, owner_key) = self
                .scope
                .parent
                .ok_or(SessionError::OwnerUnassigned { kind })?;
            Ok(SaveRequest::dependent(
                kind,
                self.record.entity.key(),
                owner_key,
                fields,
            ))
        }
    }

    /// Absorb a confirmed save: assign the key, adopt canonical fields.
    ///
    /// The state stays `Saving` until the caller finishes the cycle, since
    /// pending reorders ride the same save window.
    pub(crate) fn apply_save_reply(&mut self, reply: &SaveReply) -> Result<()> {
        self.record.entity.assign(reply.id)?;
        self.record.fields = reply.canonical_fields.clone();
        Ok(())
    }

    /// The reorder requests to issue after the record itself saved.
    pub(crate) fn reorder_batch(&self) -> Result<Vec<(EntityKind, Key, Vec<Key>)>> {
        let mut batch = Vec::with_capacity(self.reorder_pending.len());
        for &kind in &self.reorder_pending {
            let owner = self
                .record
                .entity
                .key()
                .ok_or(SessionError::OwnerUnassigned { kind })?;
            let ordered: Vec<Key> = self
                .record
                .dependents_of(kind)
                .iter()
                .filter_map(|row| row.entity.key())
                .collect();
            batch.push((kind, owner, ordered));
        }
        Ok(batch)
    }

    pub(crate) fn mark_reorder_persisted(&mut self, kind: EntityKind) {
        self.reorder_pending.remove(&kind);
        tracing::debug!(session = %self.id, %kind, "reorder persisted");
    }

    /// Drop a removed dependent's row from its list.
    pub(crate) fn drop_dependent_row(&mut self, entity: &EntityRef) {
        self.record
            .dependents_of_mut(entity.kind)
            .retain(|row| !row.same_record(entity));
        tracing::info!(session = %self.id, %entity, "dependent removed");
    }

    /// Close out a successful explicit save.
    ///
    /// Returns the surface a drained deferred action opened (if one was
    /// parked) and the feedback to relay to the opener (for child
    /// sessions). Relaying happens outside the lock.
    pub(crate) fn finish_save(
        &mut self,
    ) -> Result<(Option<OpenedSurface>, Option<(OpenerLink, FeedbackMessage)>)> {
        self.set_state(SessionState::Clean);
        self.clear_changed_marks();
        let resumed = match self.deferred.drain() {
            Some(action) => Some(self.open_for_intent(&action.intent)?),
            None => None,
        };
        let relay = match self.scope.opener {
            Some(link) => Some((link, self.feedback_message()?)),
            None => None,
        };
        Ok((resumed, relay))
    }

    /// Close out the root save a deferred action was parked behind: drain
    /// the slot and resume that action with the now-assigned key.
    pub(crate) fn resume_deferred(&mut self) -> Result<OpenedSurface> {
        self.set_state(SessionState::Clean);
        self.clear_changed_marks();
        let action = self.deferred.drain().ok_or_else(|| {
            SessionError::Core(StemmaError::internal(
                "deferred slot empty after a successful root save",
            ))
        })?;
        self.open_for_intent(&action.intent)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(session = %self.id, from = ?self.state, to = ?next, "state change");
            self.state = next;
        }
    }

    fn mark_dirty(&mut self, cause: &str) {
        if self.state == SessionState::Clean {
            tracing::debug!(session = %self.id, cause, "session dirty");
            self.state = SessionState::Dirty;
        }
    }

    fn clear_changed_marks(&mut self) {
        for rows in self.record.dependents.values_mut() {
            for row in rows.iter_mut() {
                row.changed = false;
            }
        }
    }

    fn action_allowed(&self, kind: EntityKind) -> bool {
        let base: &[EntityKind] = match self.record.entity.kind {
            EntityKind::Person => &[
                EntityKind::Event,
                EntityKind::Name,
                EntityKind::Citation,
                EntityKind::FamilyLink,
                EntityKind::Picture,
                EntityKind::Address,
            ],
            EntityKind::Family => &[
                EntityKind::Event,
                EntityKind::Citation,
                EntityKind::ChildLink,
                EntityKind::Picture,
                EntityKind::Address,
            ],
            EntityKind::Event
            | EntityKind::Name
            | EntityKind::FamilyLink
            | EntityKind::ChildLink => &[EntityKind::Citation],
            EntityKind::Citation | EntityKind::Picture | EntityKind::Address => &[],
        };
        if !base.contains(&kind) {
            return false;
        }
        // A single-dependent session only reaches its own sources.
        !self.scope.single_dependent || kind == EntityKind::Citation
    }

    pub(crate) fn open_for_intent(&mut self, intent: &Intent) -> Result<OpenedSurface> {
        let kind = intent.kind();
        let owner_key = self
            .record
            .entity
            .key()
            .ok_or(SessionError::OwnerUnassigned { kind })?;
        let title = surface_title(kind);
        let surface = self.registry.open(kind, owner_key, title)?;
        self.locked.insert(kind);
        let child = ChildSurfaceParams {
            kind,
            record: intent.existing_key(),
            owner_kind: self.record.entity.kind,
            owner_key,
            opener: self.id,
            surface,
            title: title.to_string(),
        };
        Ok(OpenedSurface { surface, child })
    }

    /// Build the canonical message for this session's committed record.
    ///
    /// Conventional tags in the canonical fields feed the typed message:
    /// `date` (number) becomes the sort key, `preferred` (flag) and `type`
    /// (text) the preferred flag and group key, `title` (text) the row
    /// title.
    fn feedback_message(&self) -> Result<FeedbackMessage> {
        let kind = self.record.entity.kind;
        let id = self
            .record
            .entity
            .key()
            .ok_or(SessionError::OwnerUnassigned { kind })?;
        let (owner_kind, owner_key) = self
            .scope
            .parent
            .ok_or(SessionError::OwnerUnassigned { kind })?;
        let fields = &self.record.fields;
        let sort_key = fields
            .get("date")
            .and_then(FieldValue::as_number)
            .map(SortKey::new)
            .unwrap_or_default();
        let preferred = fields
            .get("preferred")
            .and_then(FieldValue::as_flag)
            .unwrap_or(false);
        let group_key = fields
            .get("type")
            .and_then(FieldValue::as_text)
            .map(str::to_string);
        let title = fields
            .get("title")
            .and_then(FieldValue::as_text)
            .map_or_else(|| surface_title(kind).to_string(), str::to_string);
        Ok(FeedbackMessage {
            entity: EntityRef::assigned(kind, id),
            owner: EntityRef::assigned(owner_kind, owner_key),
            sort_key,
            preferred,
            group_key,
            title,
            fields: fields.clone(),
        })
    }

    fn unlock_if_last(&mut self, kind: EntityKind) {
        if !self.registry.has_open(kind) {
            self.locked.remove(&kind);
        }
    }

    fn absorb_feedback(
        &mut self,
        kind: EntityKind,
        surface: SurfaceId,
        message: &FeedbackMessage,
    ) -> Result<()> {
        if message.entity.kind != kind {
            return Err(SessionError::Core(StemmaError::invalid(format!(
                "feedback for {} delivered to the {kind} handler",
                message.entity.kind
            ))));
        }

        let row = DependentRow {
            entity: message.entity,
            owner: message.owner,
            sort_key: message.sort_key,
            order: 0,
            preferred: message.preferred,
            group_key: message.group_key.clone(),
            title: message.title.clone(),
            fields: message.fields.clone(),
            changed: false,
        };

        let list = self.record.dependents_of_mut(kind);
        let position = if kind.is_ordered() {
            merge::merge_ordered(list, row)
        } else {
            merge::merge_unordered(list, row)
        };
        if message.preferred {
            preferred::set_preferred(list, &message.entity)?;
        }
        tracing::debug!(session = %self.id, %kind, ?position, "feedback applied");
        self.mark_dirty("feedback");

        // Cleanup strictly after application, unlock strictly after
        // cleanup.
        self.registry.notify_closed(surface)?;
        self.unlock_if_last(kind);
        Ok(())
    }
}

impl FeedbackSink for Session {
    fn on_event_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()> {
        self.absorb_feedback(EntityKind::Event, surface, message)
    }

    fn on_name_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()> {
        self.absorb_feedback(EntityKind::Name, surface, message)
    }

    fn on_citation_committed(
        &mut self,
        surface: SurfaceId,
        message: &FeedbackMessage,
    ) -> Result<()> {
        self.absorb_feedback(EntityKind::Citation, surface, message)
    }

    fn on_family_committed(&mut self, surface: SurfaceId, message: &FeedbackMessage) -> Result<()> {
        self.absorb_feedback(EntityKind::FamilyLink, surface, message)
    }

    fn on_child_link_committed(
        &mut self,
        surface: SurfaceId,
        message: &FeedbackMessage,
    ) -> Result<()> {
        self.absorb_feedback(EntityKind::ChildLink, surface, message)
    }

    fn on_picture_committed(
        &mut self,
        surface: SurfaceId,
        message: &FeedbackMessage,
    ) -> Result<()> {
        self.absorb_feedback(EntityKind::Picture, surface, message)
    }

    fn on_address_committed(
        &mut self,
        surface: SurfaceId,
        message: &FeedbackMessage,
    ) -> Result<()> {
        self.absorb_feedback(EntityKind::Address, surface, message)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("entity", &self.record.entity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Feedback endpoint holding its session weakly.
///
/// When the session has been dropped the endpoint reports the opener as
/// unreachable instead of keeping it alive.
pub struct SessionPort {
    session: std::sync::Weak<async_lock::RwLock<Session>>,
}

impl SessionPort {
    /// Build an endpoint for a shared session.
    pub fn new(session: &SharedSession) -> Self {
        Self {
            session: Arc::downgrade(session),
        }
    }
}

#[async_trait]
impl FeedbackPort for SessionPort {
    async fn deliver(
        &self,
        surface: SurfaceId,
        message: FeedbackMessage,
    ) -> Result<FeedbackDisposition> {
        let Some(strong) = self.session.upgrade() else {
            return Ok(FeedbackDisposition::OpenerUnreachable);
        };
        let mut session = strong.write().await;
        session.apply_feedback(surface, &message)?;
        Ok(FeedbackDisposition::Delivered)
    }
}

/// Register a shared session as a feedback endpoint under its own identity.
pub async fn register_session(router: &FeedbackRouter, session: &SharedSession) {
    let id = session.read().await.id();
    router.register(id, Arc::new(SessionPort::new(session))).await;
}
