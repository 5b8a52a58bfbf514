//! Dependent-list merger
//!
//! Inserts and repositions rows in a surface's in-memory list after
//! feedback, preserving sort-key order. Insertion is stable: a new row goes
//! before the first row whose key is *strictly* greater, so equal keys keep
//! their prior relative order and the newcomer lands after them.

use crate::error::{Result, SessionError};
use stemma_core::{DependentRow, EntityRef, SortKey, StemmaError};

/// How a merge placed the incoming row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePosition {
    /// Matched an existing row; fields replaced, position unchanged.
    ReplacedInPlace,
    /// Matched an existing row whose sort key changed; row moved.
    Repositioned,
    /// No match; row inserted in order.
    Inserted,
}

/// Index of the first row whose sort key is strictly greater than `key`.
pub fn insertion_index(list: &[DependentRow], key: SortKey) -> usize {
    list.iter()
        .position(|row| row.sort_key > key)
        .unwrap_or(list.len())
}

/// Merge a canonical row into an ordered list.
pub fn merge_ordered(list: &mut Vec<DependentRow>, incoming: DependentRow) -> MergePosition {
    if let Some(index) = list.iter().position(|row| row.same_record(&incoming.entity)) {
        if list[index].sort_key == incoming.sort_key {
            let order = list[index].order;
            list[index] = incoming;
            list[index].order = order;
            return MergePosition::ReplacedInPlace;
        }
        list.remove(index);
        let at = insertion_index(list, incoming.sort_key);
        list.insert(at, incoming);
        return MergePosition::Repositioned;
    }

    let at = insertion_index(list, incoming.sort_key);
    list.insert(at, incoming);
    MergePosition::Inserted
}

/// Merge a canonical row into an unordered list (replace or append).
pub fn merge_unordered(list: &mut Vec<DependentRow>, incoming: DependentRow) -> MergePosition {
    if let Some(index) = list.iter().position(|row| row.same_record(&incoming.entity)) {
        let order = list[index].order;
        list[index] = incoming;
        list[index].order = order;
        MergePosition::ReplacedInPlace
    } else {
        list.push(incoming);
        MergePosition::Inserted
    }
}

/// Recompute a contiguous `order` for every row in its displayed sequence
/// and mark each row changed. Persistence happens on the next root save.
pub fn renumber(list: &mut [DependentRow]) {
    for (index, row) in list.iter_mut().enumerate() {
        row.order = index as u32;
        row.changed = true;
    }
}

/// Rearrange `list` into the sequence given by `ordered`, then renumber.
///
/// `ordered` must name exactly the assigned rows of the list.
pub fn apply_reorder(list: &mut Vec<DependentRow>, ordered: &[EntityRef]) -> Result<()> {
    if ordered.len() != list.len() {
        return Err(SessionError::Core(StemmaError::invalid(format!(
            "reorder names {} rows, list has {}",
            ordered.len(),
            list.len()
        ))));
    }

    let mut rearranged = Vec::with_capacity(list.len());
    for entity in ordered {
        let index = list
            .iter()
            .position(|row| row.same_record(entity))
            .ok_or_else(|| {
                SessionError::Core(StemmaError::not_found(format!(
                    "reorder names a row not in the list: {entity}"
                )))
            })?;
        rearranged.push(list.remove(index));
    }

    *list = rearranged;
    renumber(list);
    Ok(())
}
