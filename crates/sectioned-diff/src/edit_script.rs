//! Edit scripts: ordered insert/delete/move operations between two sequences.

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// A single edit operation.
///
/// `Delete::at` and `Move::from` address the old sequence; `Insert::at` and
/// `Move::to` address the new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditOp<T> {
    Insert { at: usize, element: T },
    Delete { at: usize },
    Move { from: usize, to: usize },
}

/// An ordered edit script: every delete, then every insert, then every move,
/// each group in ascending order of its first index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript<T> {
    pub ops: Vec<EditOp<T>>,
}

impl<T> Default for EditScript<T> {
    fn default() -> Self {
        Self { ops: Vec::new() }
    }
}

impl<T> EditScript<T> {
    /// Returns `true` if the two sequences were equal.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn insertions(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, EditOp::Insert { .. }))
            .count()
    }

    pub fn deletions(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, EditOp::Delete { .. }))
            .count()
    }

    pub fn moves(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, EditOp::Move { .. }))
            .count()
    }

    /// Old indices removed by the script.
    pub fn deleted_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ops.iter().filter_map(|op| match op {
            EditOp::Delete { at } => Some(*at),
            _ => None,
        })
    }

    /// New indices filled by inserted elements.
    pub fn inserted_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ops.iter().filter_map(|op| match op {
            EditOp::Insert { at, .. } => Some(*at),
            _ => None,
        })
    }

    /// `(old, new)` index pairs of moved elements.
    pub fn moved_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            EditOp::Move { from, to } => Some((*from, *to)),
            _ => None,
        })
    }
}

impl<T: Clone> EditScript<T> {
    /// Apply the script to `old`, producing the new sequence.
    ///
    /// Deleted and moved-from elements are taken out, inserted and moved
    /// elements are placed at their target slots, and the remaining slots
    /// are filled with the surviving elements in their original order.
    pub fn apply(&self, old: &[T]) -> DiffResult<Vec<T>> {
        let deleted: Vec<usize> = self.deleted_indices().collect();
        let moved: Vec<(usize, usize)> = self.moved_pairs().collect();
        let inserted = self
            .ops
            .iter()
            .filter_map(|op| match op {
                EditOp::Insert { at, element } => Some((*at, element.clone())),
                _ => None,
            })
            .collect();
        reassemble(old.to_vec(), &deleted, inserted, &moved)
    }
}

/// Rebuild a sequence from grouped operations.
///
/// `deleted` and the source side of `moved` address `old`; `inserted` and
/// the target side of `moved` address the result.
pub(crate) fn reassemble<T>(
    old: Vec<T>,
    deleted: &[usize],
    inserted: Vec<(usize, T)>,
    moved: &[(usize, usize)],
) -> DiffResult<Vec<T>> {
    let len = old.len();
    let mut taken = vec![false; len];
    for &index in deleted.iter().chain(moved.iter().map(|(from, _)| from)) {
        if index >= len {
            return Err(DiffError::IndexOutOfRange { index, len });
        }
        if taken[index] {
            return Err(DiffError::DuplicateIndex(index));
        }
        taken[index] = true;
    }

    let new_len = len - deleted.len() + inserted.len();
    let mut sources: Vec<Option<T>> = old.into_iter().map(Some).collect();
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(new_len).collect();

    let mut place = |at: usize, value: Option<T>| -> DiffResult<()> {
        let slot = slots
            .get_mut(at)
            .ok_or(DiffError::IndexOutOfRange { index: at, len: new_len })?;
        if slot.is_some() {
            return Err(DiffError::SlotConflict(at));
        }
        *slot = value;
        Ok(())
    };
    for &(from, to) in moved {
        place(to, sources[from].take())?;
    }
    for (at, element) in inserted {
        place(at, Some(element))?;
    }

    let mut survivors = sources
        .into_iter()
        .zip(taken)
        .filter_map(|(source, taken)| if taken { None } else { source });
    for slot in slots.iter_mut().filter(|slot| slot.is_none()) {
        *slot = survivors.next();
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or(DiffError::SlotConflict(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(ops: Vec<EditOp<char>>) -> EditScript<char> {
        EditScript { ops }
    }

    #[test]
    fn empty_script_is_identity() {
        let s: EditScript<char> = EditScript::default();
        assert!(s.is_empty());
        assert_eq!(s.apply(&['a', 'b']).unwrap(), vec!['a', 'b']);
    }

    #[test]
    fn counters() {
        let s = script(vec![
            EditOp::Delete { at: 0 },
            EditOp::Insert { at: 1, element: 'x' },
            EditOp::Insert { at: 2, element: 'y' },
            EditOp::Move { from: 2, to: 0 },
        ]);
        assert_eq!(s.len(), 4);
        assert_eq!(s.deletions(), 1);
        assert_eq!(s.insertions(), 2);
        assert_eq!(s.moves(), 1);
    }

    #[test]
    fn apply_grouped_operations() {
        // a b c d  ->  d x b y
        let s = script(vec![
            EditOp::Delete { at: 0 },
            EditOp::Delete { at: 2 },
            EditOp::Insert { at: 1, element: 'x' },
            EditOp::Insert { at: 3, element: 'y' },
            EditOp::Move { from: 3, to: 0 },
        ]);
        assert_eq!(
            s.apply(&['a', 'b', 'c', 'd']).unwrap(),
            vec!['d', 'x', 'b', 'y']
        );
    }

    #[test]
    fn apply_rejects_out_of_range_delete() {
        let s = script(vec![EditOp::Delete { at: 5 }]);
        assert_eq!(
            s.apply(&['a']),
            Err(DiffError::IndexOutOfRange { index: 5, len: 1 })
        );
    }

    #[test]
    fn apply_rejects_double_removal() {
        let s = script(vec![EditOp::Delete { at: 0 }, EditOp::Move { from: 0, to: 0 }]);
        assert_eq!(s.apply(&['a', 'b']), Err(DiffError::DuplicateIndex(0)));
    }

    #[test]
    fn apply_rejects_conflicting_targets() {
        let s = script(vec![
            EditOp::Insert { at: 0, element: 'x' },
            EditOp::Move { from: 1, to: 0 },
        ]);
        assert_eq!(s.apply(&['a', 'b']), Err(DiffError::SlotConflict(0)));
    }

    #[test]
    fn apply_rejects_insert_past_end() {
        let s = script(vec![EditOp::Insert { at: 3, element: 'x' }]);
        assert_eq!(
            s.apply(&['a']),
            Err(DiffError::IndexOutOfRange { index: 3, len: 2 })
        );
    }
}
