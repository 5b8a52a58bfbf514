//! Preferred-selection rule
//!
//! Rows sharing a group key (all events of one type, all family links of a
//! person) carry at most one preferred flag. Setting a row preferred clears
//! every other member of its group. A small enumerated exception table names
//! the combinations where the flag is non-optional: once set, unchecking
//! reverts without touching state: a person always keeps a primary name
//! and a preferred spouse family.

use crate::error::{Result, SessionError};
use stemma_core::{DependentRow, EntityKind, EntityRef, StemmaError};

/// Entity/group combinations whose preferred flag cannot be cleared.
const NON_OPTIONAL_PREFERRED: &[(EntityKind, &str)] = &[
    (EntityKind::Name, "primary"),
    (EntityKind::FamilyLink, "spouse"),
];

/// Whether the preferred flag is non-optional for this kind and group.
pub fn is_non_optional(kind: EntityKind, group_key: &str) -> bool {
    NON_OPTIONAL_PREFERRED
        .iter()
        .any(|(k, g)| *k == kind && *g == group_key)
}

/// Outcome of a clear request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The flag was cleared and the row marked changed.
    Cleared,
    /// Non-optional combination; the UI flag reverts to checked, state
    /// untouched.
    Reverted,
}

/// Set `target`'s preferred flag, clearing the rest of its group.
///
/// Every row whose flag actually flips is marked changed. After return,
/// exactly one row of the target's group carries the flag.
pub fn set_preferred(list: &mut [DependentRow], target: &EntityRef) -> Result<()> {
    let target_index = list
        .iter()
        .position(|row| row.same_record(target))
        .ok_or_else(|| {
            SessionError::Core(StemmaError::not_found(format!(
                "no row for {target} in its list"
            )))
        })?;

    let group = list[target_index].group_key.clone();
    for (index, row) in list.iter_mut().enumerate() {
        let in_group = row.group_key == group;
        let should_prefer = index == target_index;
        if in_group && row.preferred != should_prefer {
            row.preferred = should_prefer;
            row.changed = true;
        }
    }
    Ok(())
}

/// Clear `target`'s preferred flag, unless its combination is non-optional.
pub fn clear_preferred(list: &mut [DependentRow], target: &EntityRef) -> Result<ClearOutcome> {
    let row = list
        .iter_mut()
        .find(|row| row.same_record(target))
        .ok_or_else(|| {
            SessionError::Core(StemmaError::not_found(format!(
                "no row for {target} in its list"
            )))
        })?;

    let non_optional = row
        .group_key
        .as_deref()
        .is_some_and(|group| is_non_optional(row.entity.kind, group));
    if non_optional {
        tracing::debug!(entity = %row.entity, "preferred flag is non-optional; revert");
        return Ok(ClearOutcome::Reverted);
    }

    if row.preferred {
        row.preferred = false;
        row.changed = true;
    }
    Ok(ClearOutcome::Cleared)
}
