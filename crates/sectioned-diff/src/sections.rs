//! Two-level diff: sections first, then items within sections present on
//! both sides.
//!
//! The change stream is emitted in a fixed order that a consumer can replay
//! against its own copy of the old collection:
//!
//! ```text
//! BeginBatch
//! DeleteSections   old section indices
//! DeleteItems      (old section, old item)
//! MoveSection*     old index -> new index
//! MoveItem*        (new section, old item) -> (new section, new item)
//! InsertSections   new section indices
//! InsertItems      (new section, new item)
//! EndBatch
//! ```
//!
//! Items never move between sections: an item leaving one section and an
//! equal item appearing in another are reported as a delete plus an insert.

use sectioned_types::{Change, Collection, Location};
use tracing::debug;

use crate::config::DiffOptions;
use crate::engine::align;

/// A section present on both sides of a diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionMatch {
    pub old: usize,
    pub new: usize,
}

/// The result of diffing two collections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionDiff {
    /// Old indices of removed sections, ascending.
    pub section_deletes: Vec<usize>,
    /// New indices of added sections, ascending.
    pub section_inserts: Vec<usize>,
    /// `(old, new)` indices of sections that changed position.
    pub section_moves: Vec<(usize, usize)>,
    /// Sections whose items were diffed, ordered by new index.
    pub matched: Vec<SectionMatch>,
    /// Removed items at their old locations, ascending.
    pub item_deletes: Vec<Location>,
    /// Added items at their new locations, ascending.
    pub item_inserts: Vec<Location>,
    /// Items that moved within a matched section.
    pub item_moves: Vec<(Location, Location)>,
}

impl CollectionDiff {
    /// Returns `true` if the collections were equal.
    pub fn is_empty(&self) -> bool {
        self.section_deletes.is_empty()
            && self.section_inserts.is_empty()
            && self.section_moves.is_empty()
            && self.item_deletes.is_empty()
            && self.item_inserts.is_empty()
            && self.item_moves.is_empty()
    }

    /// Number of structural operations, counting each index once.
    pub fn operation_count(&self) -> usize {
        self.section_deletes.len()
            + self.section_inserts.len()
            + self.section_moves.len()
            + self.item_deletes.len()
            + self.item_inserts.len()
            + self.item_moves.len()
    }

    /// The ordered change stream without batch markers.
    pub fn structural_changes(&self) -> Vec<Change> {
        let mut changes = Vec::with_capacity(4 + self.section_moves.len() + self.item_moves.len());
        changes.push(Change::DeleteSections(self.section_deletes.clone()));
        changes.push(Change::DeleteItems(self.item_deletes.clone()));
        changes.extend(
            self.section_moves
                .iter()
                .map(|&(from, to)| Change::MoveSection { from, to }),
        );
        changes.extend(
            self.item_moves
                .iter()
                .map(|&(from, to)| Change::MoveItem { from, to }),
        );
        changes.push(Change::InsertSections(self.section_inserts.clone()));
        changes.push(Change::InsertItems(self.item_inserts.clone()));
        changes
    }

    /// The ordered change stream wrapped in `BeginBatch` / `EndBatch`.
    pub fn changes(&self) -> Vec<Change> {
        let mut changes = vec![Change::BeginBatch];
        changes.extend(self.structural_changes());
        changes.push(Change::EndBatch);
        changes
    }

    fn diff_items<T: PartialEq>(
        &mut self,
        matched: SectionMatch,
        old_items: &[T],
        new_items: &[T],
        options: &DiffOptions,
    ) {
        let alignment = align(old_items, new_items, options);
        self.item_deletes.extend(
            alignment
                .deleted
                .iter()
                .map(|&i| Location::new(matched.old, i)),
        );
        self.item_inserts.extend(
            alignment
                .inserted
                .iter()
                .map(|&i| Location::new(matched.new, i)),
        );
        self.item_moves.extend(
            alignment
                .moved
                .iter()
                .map(|&(from, to)| (Location::new(matched.new, from), Location::new(matched.new, to))),
        );
        self.matched.push(matched);
    }
}

/// Diff two collections.
///
/// Sections are aligned by metadata equality. Sections paired by the
/// alignment (kept in place or moved) then have their items aligned.
pub fn diff_collections<M: PartialEq, T: PartialEq>(
    old: &Collection<M, T>,
    new: &Collection<M, T>,
    options: &DiffOptions,
) -> CollectionDiff {
    let old_meta: Vec<&M> = old.sections().iter().map(|s| &s.metadata).collect();
    let new_meta: Vec<&M> = new.sections().iter().map(|s| &s.metadata).collect();
    let sections = align(&old_meta, &new_meta, options);

    let mut result = CollectionDiff {
        section_deletes: sections.deleted.clone(),
        section_inserts: sections.inserted.clone(),
        section_moves: sections.moved.clone(),
        ..Default::default()
    };

    for (old_index, new_index) in sections.matched() {
        result.diff_items(
            SectionMatch {
                old: old_index,
                new: new_index,
            },
            &old.sections()[old_index].items,
            &new.sections()[new_index].items,
            options,
        );
    }
    result.item_deletes.sort_unstable();
    result.item_inserts.sort_unstable();

    debug!(
        old_sections = old.section_count(),
        new_sections = new.section_count(),
        matched = result.matched.len(),
        operations = result.operation_count(),
        "diffed collections"
    );
    result
}

/// Diff the items of one section whose metadata is unchanged.
pub fn diff_section_items<T: PartialEq>(
    section: usize,
    old_items: &[T],
    new_items: &[T],
    options: &DiffOptions,
) -> CollectionDiff {
    let mut result = CollectionDiff::default();
    result.diff_items(
        SectionMatch {
            old: section,
            new: section,
        },
        old_items,
        new_items,
        options,
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply_batch;
    use proptest::prelude::*;
    use sectioned_types::Section;

    type Coll = Collection<&'static str, i32>;

    fn coll(sections: &[(&'static str, &[i32])]) -> Coll {
        sections
            .iter()
            .map(|(m, items)| Section::with_items(*m, items.iter().copied()))
            .collect()
    }

    #[test]
    fn identical_collections_yield_empty_payloads() {
        let c = coll(&[("A", &[1, 2]), ("B", &[3])]);
        let diff = diff_collections(&c, &c, &DiffOptions::default());
        assert!(diff.is_empty());
        assert_eq!(diff.matched.len(), 2);
        assert_eq!(
            diff.changes(),
            vec![
                Change::BeginBatch,
                Change::DeleteSections(vec![]),
                Change::DeleteItems(vec![]),
                Change::InsertSections(vec![]),
                Change::InsertItems(vec![]),
                Change::EndBatch,
            ]
        );
    }

    #[test]
    fn swapped_sections_with_new_item() {
        let old = coll(&[("A", &[1, 2]), ("B", &[3])]);
        let new = coll(&[("B", &[3, 4]), ("A", &[1, 2])]);
        let diff = diff_collections(&old, &new, &DiffOptions::default());

        assert!(diff.section_deletes.is_empty());
        assert!(diff.section_inserts.is_empty());
        assert_eq!(diff.section_moves.len(), 1);
        let mv = diff.section_moves[0];
        assert!(mv == (1, 0) || mv == (0, 1), "unexpected move {mv:?}");

        assert!(diff.item_deletes.is_empty());
        assert!(diff.item_moves.is_empty());
        assert_eq!(diff.item_inserts, vec![Location::new(0, 1)]);

        assert_eq!(apply_batch(&old, &diff.changes(), &new).unwrap(), new);
    }

    #[test]
    fn disjoint_collections_replace_every_section() {
        let old = coll(&[("A", &[1]), ("B", &[2])]);
        let new = coll(&[("C", &[1]), ("D", &[2]), ("E", &[])]);
        let diff = diff_collections(&old, &new, &DiffOptions::default());
        assert_eq!(diff.section_deletes, vec![0, 1]);
        assert_eq!(diff.section_inserts, vec![0, 1, 2]);
        assert!(diff.matched.is_empty());
        assert!(diff.item_deletes.is_empty() && diff.item_inserts.is_empty());
    }

    #[test]
    fn items_do_not_move_across_sections() {
        let old = coll(&[("A", &[1, 2]), ("B", &[])]);
        let new = coll(&[("A", &[1]), ("B", &[2])]);
        let diff = diff_collections(&old, &new, &DiffOptions::default());
        assert!(diff.item_moves.is_empty());
        assert_eq!(diff.item_deletes, vec![Location::new(0, 1)]);
        assert_eq!(diff.item_inserts, vec![Location::new(1, 0)]);
    }

    #[test]
    fn item_moves_use_new_section_index() {
        let old = coll(&[("A", &[]), ("B", &[1, 2, 3])]);
        let new = coll(&[("B", &[3, 1, 2])]);
        let diff = diff_collections(&old, &new, &DiffOptions::default());
        assert_eq!(diff.section_deletes, vec![0]);
        assert_eq!(
            diff.item_moves,
            vec![(Location::new(0, 2), Location::new(0, 0))]
        );
        assert_eq!(apply_batch(&old, &diff.changes(), &new).unwrap(), new);
    }

    #[test]
    fn stream_order_is_fixed() {
        let old = coll(&[("A", &[1, 2]), ("B", &[3]), ("C", &[])]);
        let new = coll(&[("C", &[]), ("D", &[9]), ("A", &[2, 1])]);
        let changes = diff_collections(&old, &new, &DiffOptions::default()).changes();
        let kinds: Vec<_> = changes.iter().map(|c| c.kind().to_string()).collect();
        let pos = |k: &str| kinds.iter().position(|x| x == k).unwrap();
        assert_eq!(pos("BeginBatch"), 0);
        assert!(pos("DeleteSections") < pos("DeleteItems"));
        assert!(pos("DeleteItems") < pos("MoveSection"));
        assert!(pos("MoveSection") < pos("MoveItem"));
        assert!(pos("MoveItem") < pos("InsertSections"));
        assert!(pos("InsertSections") < pos("InsertItems"));
        assert_eq!(pos("EndBatch"), kinds.len() - 1);
        assert_eq!(apply_batch(&old, &changes, &new).unwrap(), new);
    }

    #[test]
    fn section_items_only() {
        let diff = diff_section_items(2, &[1, 2, 3], &[2, 3, 4], &DiffOptions::default());
        assert_eq!(diff.item_deletes, vec![Location::new(2, 0)]);
        assert_eq!(diff.item_inserts, vec![Location::new(2, 2)]);
        assert!(diff.section_moves.is_empty());
    }

    fn unique_keys() -> impl Strategy<Value = Vec<char>> {
        proptest::sample::subsequence(vec!['A', 'B', 'C', 'D', 'E'], 0..=5).prop_shuffle()
    }

    fn any_keys() -> impl Strategy<Value = Vec<char>> {
        proptest::collection::vec(proptest::sample::select(vec!['A', 'B', 'C']), 0..5)
    }

    fn collection(keys: impl Strategy<Value = Vec<char>>) -> impl Strategy<Value = Collection<char, u8>> {
        keys.prop_flat_map(|keys| {
            let n = keys.len();
            (
                Just(keys),
                proptest::collection::vec(proptest::collection::vec(0u8..6, 0..6), n),
            )
        })
        .prop_map(|(keys, items)| {
            keys.into_iter()
                .zip(items)
                .map(|(k, i)| Section::with_items(k, i))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn replay_reaches_new_collection(
            old in collection(unique_keys()),
            new in collection(unique_keys()),
        ) {
            let changes = diff_collections(&old, &new, &DiffOptions::default()).changes();
            prop_assert_eq!(apply_batch(&old, &changes, &new).unwrap(), new);
        }

        #[test]
        fn replay_with_repeated_metadata(
            old in collection(any_keys()),
            new in collection(any_keys()),
            detect_moves in any::<bool>(),
        ) {
            let options = DiffOptions { detect_moves, ..DiffOptions::default() };
            let changes = diff_collections(&old, &new, &options).changes();
            prop_assert_eq!(apply_batch(&old, &changes, &new).unwrap(), new);
        }

        #[test]
        fn self_diff_has_no_operations(c in collection(any_keys())) {
            let diff = diff_collections(&c, &c, &DiffOptions::default());
            prop_assert!(diff.is_empty());
            prop_assert_eq!(diff.matched.len(), c.section_count());
        }
    }
}
