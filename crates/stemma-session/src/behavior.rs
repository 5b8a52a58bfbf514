//! Declarative field-behavior table
//!
//! Built once at session construction: each field tag maps to a descriptor
//! carrying its validation limits and normalizer. Edits dispatch on the tag
//! through this table instead of re-parsing field names at every event.
//! Fields without an entry pass through untouched.

use crate::error::{Result, SessionError};
use stemma_core::{EntityKind, FieldValue};
use std::collections::HashMap;

/// How a text value is normalized before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    /// Store as typed.
    None,
    /// Trim surrounding whitespace.
    Trim,
    /// Trim and uppercase (used for surname sort forms).
    TrimUppercase,
}

impl Normalize {
    fn apply(self, text: &str) -> String {
        match self {
            Self::None => text.to_string(),
            Self::Trim => text.trim().to_string(),
            Self::TrimUppercase => text.trim().to_uppercase(),
        }
    }
}

/// Behavior descriptor for one field tag.
#[derive(Debug, Clone)]
pub struct FieldBehavior {
    /// The field tag this descriptor governs.
    pub tag: &'static str,
    /// Whether an empty value blocks the triggering action.
    pub required: bool,
    /// Maximum accepted text length.
    pub max_len: Option<usize>,
    /// Normalizer applied to text values.
    pub normalize: Normalize,
}

const fn field(
    tag: &'static str,
    required: bool,
    max_len: Option<usize>,
    normalize: Normalize,
) -> FieldBehavior {
    FieldBehavior {
        tag,
        required,
        max_len,
        normalize,
    }
}

fn descriptors(kind: EntityKind) -> &'static [FieldBehavior] {
    const PERSON: &[FieldBehavior] = &[
        field("surname", true, Some(120), Normalize::Trim),
        field("given", false, Some(120), Normalize::Trim),
        field("sort surname", false, Some(120), Normalize::TrimUppercase),
        field("occupation", false, Some(200), Normalize::Trim),
    ];
    const FAMILY: &[FieldBehavior] = &[field("family name", false, Some(120), Normalize::Trim)];
    const EVENT: &[FieldBehavior] = &[
        field("type", true, Some(60), Normalize::Trim),
        field("place", false, Some(200), Normalize::Trim),
        field("description", false, Some(500), Normalize::Trim),
    ];
    const NAME: &[FieldBehavior] = &[
        field("surname", true, Some(120), Normalize::Trim),
        field("given", false, Some(120), Normalize::Trim),
    ];
    const CITATION: &[FieldBehavior] = &[
        field("source", true, Some(200), Normalize::Trim),
        field("page", false, Some(120), Normalize::Trim),
    ];
    const EMPTY: &[FieldBehavior] = &[];
    const PICTURE: &[FieldBehavior] = &[
        field("caption", false, Some(200), Normalize::Trim),
        field("path", true, Some(500), Normalize::Trim),
    ];
    const ADDRESS: &[FieldBehavior] = &[
        field("street", false, Some(200), Normalize::Trim),
        field("city", true, Some(120), Normalize::Trim),
        field("country", false, Some(120), Normalize::Trim),
    ];
    match kind {
        EntityKind::Person => PERSON,
        EntityKind::Family => FAMILY,
        EntityKind::Event => EVENT,
        EntityKind::Name => NAME,
        EntityKind::Citation => CITATION,
        EntityKind::FamilyLink | EntityKind::ChildLink => EMPTY,
        EntityKind::Picture => PICTURE,
        EntityKind::Address => ADDRESS,
    }
}

/// The per-session lookup table, keyed by field tag.
#[derive(Debug)]
pub struct BehaviorTable {
    by_tag: HashMap<&'static str, FieldBehavior>,
}

impl BehaviorTable {
    /// Build the table for a session editing records of `kind`.
    pub fn for_kind(kind: EntityKind) -> Self {
        let by_tag = descriptors(kind)
            .iter()
            .map(|behavior| (behavior.tag, behavior.clone()))
            .collect();
        Self { by_tag }
    }

    /// The descriptor for `tag`, if one is declared.
    pub fn get(&self, tag: &str) -> Option<&FieldBehavior> {
        self.by_tag.get(tag)
    }

    /// Validate and normalize one edit. Fails locally, before any request
    /// is built.
    pub fn check(&self, tag: &str, value: FieldValue) -> Result<FieldValue> {
        let Some(behavior) = self.by_tag.get(tag) else {
            return Ok(value);
        };

        match value {
            FieldValue::Text(text) => {
                let normalized = behavior.normalize.apply(&text);
                if behavior.required && normalized.is_empty() {
                    return Err(SessionError::Validation {
                        field: tag.to_string(),
                        message: "a value is required".to_string(),
                    });
                }
                if let Some(max) = behavior.max_len {
                    if normalized.chars().count() > max {
                        return Err(SessionError::Validation {
                            field: tag.to_string(),
                            message: format!("longer than {max} characters"),
                        });
                    }
                }
                Ok(FieldValue::Text(normalized))
            }
            FieldValue::Empty if behavior.required => Err(SessionError::Validation {
                field: tag.to_string(),
                message: "a value is required".to_string(),
            }),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn required_fields_reject_blank_text() {
        let table = BehaviorTable::for_kind(EntityKind::Person);
        let err = table
            .check("surname", FieldValue::from("   "))
            .unwrap_err();
        assert_matches!(err, SessionError::Validation { field, .. } if field == "surname");
    }

    #[test]
    fn text_is_normalized_per_descriptor() {
        let table = BehaviorTable::for_kind(EntityKind::Person);
        let value = table
            .check("sort surname", FieldValue::from("  van Dijk "))
            .expect("valid");
        assert_eq!(value.as_text(), Some("VAN DIJK"));
    }

    #[test]
    fn undeclared_tags_pass_through() {
        let table = BehaviorTable::for_kind(EntityKind::Person);
        let value = table
            .check("nickname", FieldValue::from(" unchanged "))
            .expect("valid");
        assert_eq!(value.as_text(), Some(" unchanged "));
    }

    #[test]
    fn over_long_values_are_rejected() {
        let table = BehaviorTable::for_kind(EntityKind::Event);
        let long = "x".repeat(61);
        assert!(table.check("type", FieldValue::from(long)).is_err());
    }
}
