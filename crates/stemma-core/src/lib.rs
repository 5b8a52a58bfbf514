//! # Stemma Core
//!
//! Foundation types for the Stemma editing-session coordination core:
//! typed identifiers, the entity model and its identifier lifecycle, sort
//! keys, the persistence-gateway effect interface, and the unified error
//! type. This crate is pure: it has no runtime dependencies and performs
//! no I/O; the session layer drives everything through the effect traits.

pub mod effects;
pub mod entity;
pub mod errors;
pub mod identifiers;
pub mod sort;

pub use effects::{Candidate, GatewayError, PersistenceGateway, SaveReply, SaveRequest};
pub use entity::{DependentRow, EntityKind, EntityRef, FieldMap, FieldValue, RecordId, RootRecord};
pub use errors::{Result, StemmaError};
pub use identifiers::{Key, SessionId, SurfaceId};
pub use sort::SortKey;
