//! Entity model: kinds, reference lifecycle, and record shapes
//!
//! A session edits one *root* record (a person or a family) that owns a set
//! of *dependent* records, each edited in its own child surface. The central
//! lifecycle rule lives here: an [`EntityRef`] starts [`RecordId::Unassigned`]
//! and transitions exactly once to `Assigned` on first successful
//! persistence. No dependent may be saved while its owner is unassigned.

use crate::errors::{Result, StemmaError};
use crate::identifiers::Key;
use crate::sort::SortKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of record the coordination core knows about.
///
/// `Person` and `Family` are root kinds; everything else is a dependent
/// owned by a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// A person record (root).
    Person,
    /// A family record (root).
    Family,
    /// A life event (birth, marriage, occupation, ...).
    Event,
    /// An alternate name.
    Name,
    /// A source citation.
    Citation,
    /// A link from a person to a family (as spouse/partner).
    FamilyLink,
    /// A link from a family to a child person.
    ChildLink,
    /// A picture attachment.
    Picture,
    /// A postal address.
    Address,
}

impl EntityKind {
    /// Whether records of this kind anchor a session of their own.
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Person | Self::Family)
    }

    /// Whether records of this kind are owned by a root record.
    pub fn is_dependent(&self) -> bool {
        !self.is_root()
    }

    /// Whether at most one editing surface of this kind may be open per
    /// owner at a time.
    ///
    /// Family and child links are edited in a combined per-owner surface, so
    /// a second one racing on the same owner must be rejected. Events,
    /// names, citations, pictures, and addresses each get their own surface
    /// per row.
    pub fn singleton_surface(&self) -> bool {
        matches!(self, Self::FamilyLink | Self::ChildLink)
    }

    /// Whether rows of this kind are kept in sort-key order.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Event | Self::ChildLink)
    }

    /// Stable label used in log lines and surface titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Family => "family",
            Self::Event => "event",
            Self::Name => "name",
            Self::Citation => "citation",
            Self::FamilyLink => "family link",
            Self::ChildLink => "child link",
            Self::Picture => "picture",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Persistence state of one record's identifier.
///
/// `Unassigned` means the record has never been saved. The transition to
/// `Assigned` happens exactly once and is never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordId {
    /// Not yet persisted; no durable key exists.
    Unassigned,
    /// Persisted under the given store key.
    Assigned(Key),
}

impl RecordId {
    /// Whether a durable key has been assigned.
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// The assigned key, if any.
    pub fn key(&self) -> Option<Key> {
        match self {
            Self::Assigned(key) => Some(*key),
            Self::Unassigned => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => write!(f, "unassigned"),
            Self::Assigned(key) => write!(f, "{key}"),
        }
    }
}

/// A kind paired with an identifier lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// What kind of record this refers to.
    pub kind: EntityKind,
    /// Identifier lifecycle state.
    pub id: RecordId,
}

impl EntityRef {
    /// Reference to a record that has not been persisted yet.
    pub fn unassigned(kind: EntityKind) -> Self {
        Self {
            kind,
            id: RecordId::Unassigned,
        }
    }

    /// Reference to an already persisted record.
    pub fn assigned(kind: EntityKind, key: Key) -> Self {
        Self {
            kind,
            id: RecordId::Assigned(key),
        }
    }

    /// Whether this reference carries a durable key.
    pub fn is_assigned(&self) -> bool {
        self.id.is_assigned()
    }

    /// The durable key, if assigned.
    pub fn key(&self) -> Option<Key> {
        self.id.key()
    }

    /// Record the key handed back by the store on first successful save.
    ///
    /// Assigning the key a reference already carries is idempotent, since
    /// feedback may legitimately be delivered more than once. Assigning a
    /// *different* key is a conflict: identifiers transition exactly once.
    pub fn assign(&mut self, key: Key) -> Result<()> {
        match self.id {
            RecordId::Unassigned => {
                self.id = RecordId::Assigned(key);
                Ok(())
            }
            RecordId::Assigned(existing) if existing == key => Ok(()),
            RecordId::Assigned(existing) => Err(StemmaError::conflict(format!(
                "{} already assigned {existing}, refusing {key}",
                self.kind
            ))),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A single field value as the store hands it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Numeric value (dates travel as serials).
    Number(i64),
    /// Boolean flag.
    Flag(bool),
    /// Explicitly empty.
    Empty,
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric content, if this is a number.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Flag content, if this is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Ordered field name → value map.
///
/// Insertion order is preserved so canonical state round-trips without
/// reshuffling the surface's field layout.
pub type FieldMap = IndexMap<String, FieldValue>;

/// One dependent record as held in its owner's in-memory list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentRow {
    /// The dependent record itself.
    pub entity: EntityRef,
    /// The root that owns it.
    pub owner: EntityRef,
    /// Position in the list's total order.
    pub sort_key: SortKey,
    /// Contiguous display index, recomputed by an explicit reorder.
    pub order: u32,
    /// Preferred flag within this row's group (see the preferred rule).
    pub preferred: bool,
    /// Group key for preferred-flag exclusivity (e.g. an event type tag).
    pub group_key: Option<String>,
    /// Human-readable row title, used in guard messages.
    pub title: String,
    /// Current field values.
    pub fields: FieldMap,
    /// Whether this row carries unsaved changes.
    pub changed: bool,
}

impl DependentRow {
    /// Build a row for a not-yet-saved dependent of `owner`.
    pub fn new(kind: EntityKind, owner: EntityRef, title: impl Into<String>) -> Self {
        Self {
            entity: EntityRef::unassigned(kind),
            owner,
            sort_key: SortKey::default(),
            order: 0,
            preferred: false,
            group_key: None,
            title: title.into(),
            fields: FieldMap::new(),
            changed: true,
        }
    }

    /// Whether `other` refers to the same persisted record.
    ///
    /// Two unassigned rows are never the same record; identity only exists
    /// once the store has handed out a key.
    pub fn same_record(&self, other: &EntityRef) -> bool {
        match (self.entity.key(), other.key()) {
            (Some(a), Some(b)) => self.entity.kind == other.kind && a == b,
            _ => false,
        }
    }
}

/// The root record a session edits, with its dependent lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootRecord {
    /// The root entity reference.
    pub entity: EntityRef,
    /// Root-level field values.
    pub fields: FieldMap,
    /// Dependent rows grouped by kind, each list in sort-key order.
    pub dependents: IndexMap<EntityKind, Vec<DependentRow>>,
}

impl RootRecord {
    /// A fresh, never-saved root of the given kind.
    pub fn unsaved(kind: EntityKind) -> Self {
        Self {
            entity: EntityRef::unassigned(kind),
            fields: FieldMap::new(),
            dependents: IndexMap::new(),
        }
    }

    /// A root loaded from storage under an existing key.
    pub fn loaded(kind: EntityKind, key: Key) -> Self {
        Self {
            entity: EntityRef::assigned(kind, key),
            fields: FieldMap::new(),
            dependents: IndexMap::new(),
        }
    }

    /// The dependent list for `kind`, empty slice if none exist yet.
    pub fn dependents_of(&self, kind: EntityKind) -> &[DependentRow] {
        self.dependents.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Mutable dependent list for `kind`, created on first use.
    pub fn dependents_of_mut(&mut self, kind: EntityKind) -> &mut Vec<DependentRow> {
        self.dependents.entry(kind).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_assignment_is_once_and_idempotent() {
        let mut entity = EntityRef::unassigned(EntityKind::Person);
        assert!(!entity.is_assigned());

        entity.assign(Key::new(501)).expect("first assign");
        assert_eq!(entity.key(), Some(Key::new(501)));

        // Redelivered feedback repeats the same key.
        entity.assign(Key::new(501)).expect("idempotent assign");

        // A different key never overwrites.
        let err = entity.assign(Key::new(502)).unwrap_err();
        assert!(err.to_string().contains("already assigned"));
        assert_eq!(entity.key(), Some(Key::new(501)));
    }

    #[test]
    fn unassigned_rows_are_never_the_same_record() {
        let owner = EntityRef::assigned(EntityKind::Person, Key::new(1));
        let row = DependentRow::new(EntityKind::Event, owner, "Birth");
        assert!(!row.same_record(&EntityRef::unassigned(EntityKind::Event)));
    }

    #[test]
    fn root_kinds_and_surface_rules() {
        assert!(EntityKind::Person.is_root());
        assert!(EntityKind::Event.is_dependent());
        assert!(EntityKind::FamilyLink.singleton_surface());
        assert!(!EntityKind::Event.singleton_surface());
        assert!(EntityKind::Event.is_ordered());
    }
}
