//! # Intents: deferred user actions as values
//!
//! An intent is a tagged description of "what to do once the root record has
//! a durable identifier", never a live reference to a UI control. When a
//! user action requires an assigned root and the root is still unassigned,
//! the intent is parked in the deferred slot, the root save runs, and the
//! coordinator dispatches on the intent afterwards.

use serde::{Deserialize, Serialize};
use stemma_core::{EntityKind, Key};

/// A deferrable user action and its parameters.
///
/// Every variant opens a child editing surface; `None` for the record key
/// means "create a new one". Family-link and child-link surfaces edit the
/// whole per-owner group at once, so they carry no key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Open the event editor.
    OpenEventEditor {
        /// Existing event to edit, or `None` to create one.
        event: Option<Key>,
    },

    /// Open the alternate-name editor.
    OpenNameEditor {
        /// Existing name to edit, or `None` to create one.
        name: Option<Key>,
    },

    /// Open the source-citation editor.
    OpenCitationEditor {
        /// Existing citation to edit, or `None` to create one.
        citation: Option<Key>,
    },

    /// Open the per-owner family-links surface ("Marriages").
    OpenFamilyEditor,

    /// Open the per-owner child-links surface ("Children").
    OpenChildLinkEditor,

    /// Open the picture editor.
    OpenPictureEditor {
        /// Existing picture to edit, or `None` to attach one.
        picture: Option<Key>,
    },

    /// Open the address editor.
    OpenAddressEditor {
        /// Existing address to edit, or `None` to create one.
        address: Option<Key>,
    },
}

impl Intent {
    /// The dependent kind this intent operates on.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::OpenEventEditor { .. } => EntityKind::Event,
            Self::OpenNameEditor { .. } => EntityKind::Name,
            Self::OpenCitationEditor { .. } => EntityKind::Citation,
            Self::OpenFamilyEditor => EntityKind::FamilyLink,
            Self::OpenChildLinkEditor => EntityKind::ChildLink,
            Self::OpenPictureEditor { .. } => EntityKind::Picture,
            Self::OpenAddressEditor { .. } => EntityKind::Address,
        }
    }

    /// The existing record the editor should load, if any.
    pub fn existing_key(&self) -> Option<Key> {
        match self {
            Self::OpenEventEditor { event } => *event,
            Self::OpenNameEditor { name } => *name,
            Self::OpenCitationEditor { citation } => *citation,
            Self::OpenPictureEditor { picture } => *picture,
            Self::OpenAddressEditor { address } => *address,
            Self::OpenFamilyEditor | Self::OpenChildLinkEditor => None,
        }
    }
}

/// Title shown for a child surface of the given kind.
///
/// Also the name reported by the commit guard when the surface blocks a
/// root save.
pub fn surface_title(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => "Person",
        EntityKind::Family => "Family",
        EntityKind::Event => "Events",
        EntityKind::Name => "Names",
        EntityKind::Citation => "Sources",
        EntityKind::FamilyLink => "Marriages",
        EntityKind::ChildLink => "Children",
        EntityKind::Picture => "Pictures",
        EntityKind::Address => "Addresses",
    }
}
