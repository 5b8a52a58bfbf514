//! Property tests for the list merger and the preferred-selection rule.

use proptest::prelude::*;
use stemma_core::{DependentRow, EntityKind, EntityRef, Key, SortKey};
use stemma_session::preferred::set_preferred;
use stemma_session::{merge_ordered, MergePosition};

fn row(key: u64, sort: i64) -> DependentRow {
    let owner = EntityRef::assigned(EntityKind::Person, Key::new(1));
    let mut row = DependentRow::new(EntityKind::Event, owner, "Events");
    row.entity = EntityRef::assigned(EntityKind::Event, Key::new(key));
    row.sort_key = SortKey::new(sort);
    row.changed = false;
    row
}

proptest! {
    /// Merging a fresh row into any sorted list keeps it sorted, and the
    /// newcomer lands after every equal key.
    #[test]
    fn merge_preserves_order_and_stability(
        sorts in proptest::collection::vec(0i64..50, 0..12),
        new_sort in 0i64..50,
    ) {
        let mut sorted = sorts;
        sorted.sort_unstable();
        let mut list: Vec<DependentRow> = sorted
            .iter()
            .enumerate()
            .map(|(index, sort)| row(index as u64 + 1, *sort))
            .collect();

        let position = merge_ordered(&mut list, row(1000, new_sort));
        prop_assert_eq!(position, MergePosition::Inserted);
        prop_assert!(list
            .windows(2)
            .all(|pair| pair[0].sort_key <= pair[1].sort_key));

        let at = list
            .iter()
            .position(|row| row.entity.key() == Some(Key::new(1000)))
            .expect("merged row present");
        prop_assert!(list[..at]
            .iter()
            .all(|row| row.sort_key <= SortKey::new(new_sort)));
        prop_assert!(list[at + 1..]
            .iter()
            .all(|row| row.sort_key > SortKey::new(new_sort)));
    }

    /// Re-merging a row that is already present never grows the list.
    #[test]
    fn remerge_is_idempotent(
        sorts in proptest::collection::vec(0i64..50, 1..12),
        pick in 0usize..12,
    ) {
        let mut sorted = sorts;
        sorted.sort_unstable();
        let mut list: Vec<DependentRow> = sorted
            .iter()
            .enumerate()
            .map(|(index, sort)| row(index as u64 + 1, *sort))
            .collect();
        let len = list.len();
        let pick = pick % len;
        let again = list[pick].clone();

        let position = merge_ordered(&mut list, again);
        prop_assert_eq!(position, MergePosition::ReplacedInPlace);
        prop_assert_eq!(list.len(), len);
    }

    /// After setting any member preferred, its group has exactly one
    /// preferred row: the one that was set.
    #[test]
    fn exactly_one_preferred_after_set(
        (count, target) in (1usize..8).prop_flat_map(|n| (Just(n), 0..n)),
    ) {
        let mut list: Vec<DependentRow> = (0..count)
            .map(|index| {
                let mut row = row(index as u64 + 1, index as i64);
                row.group_key = Some("occupation".to_string());
                row.preferred = index == 0;
                row
            })
            .collect();

        let entity = EntityRef::assigned(EntityKind::Event, Key::new(target as u64 + 1));
        prop_assert!(set_preferred(&mut list, &entity).is_ok());

        let preferred: Vec<usize> = list
            .iter()
            .enumerate()
            .filter(|(_, row)| row.preferred)
            .map(|(index, _)| index)
            .collect();
        prop_assert_eq!(preferred, vec![target]);
    }
}
