//! The edit-script engine.
//!
//! Aligns two sequences with a longest-common-subsequence algorithm from the
//! `similar` crate, then optionally coalesces delete/insert pairs of equal
//! elements into moves. Only `PartialEq` is required of the elements.

use std::convert::Infallible;

use similar::algorithms::{lcs, myers, DiffHook};
use tracing::trace;

use crate::config::{Algorithm, DiffOptions};
use crate::edit_script::{EditOp, EditScript};

/// Raw alignment of two sequences.
///
/// Every old index appears exactly once in `kept`, `deleted` or as the
/// source of a `moved` pair; every new index appears exactly once in
/// `kept`, `inserted` or as the target of a `moved` pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    /// `(old, new)` pairs of the common subsequence, ascending on both sides.
    pub kept: Vec<(usize, usize)>,
    /// Old indices with no counterpart, ascending.
    pub deleted: Vec<usize>,
    /// New indices with no counterpart, ascending.
    pub inserted: Vec<usize>,
    /// `(old, new)` pairs of equal elements that changed position,
    /// ascending by old index.
    pub moved: Vec<(usize, usize)>,
}

impl Alignment {
    /// Every `(old, new)` pair of elements present on both sides, kept or
    /// moved, ordered by new index.
    pub fn matched(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> =
            self.kept.iter().chain(self.moved.iter()).copied().collect();
        pairs.sort_by_key(|&(_, new)| new);
        pairs
    }

    /// Returns `true` if the sequences were equal.
    pub fn is_identity(&self) -> bool {
        self.deleted.is_empty() && self.inserted.is_empty() && self.moved.is_empty()
    }
}

/// Collects `similar` hook callbacks into index lists. The algorithm sees
/// only the trimmed middle of each side, so its indices are shifted back by
/// the offsets.
#[derive(Default)]
struct Recorder {
    old_offset: usize,
    new_offset: usize,
    kept: Vec<(usize, usize)>,
    deleted: Vec<usize>,
    inserted: Vec<usize>,
}

impl DiffHook for Recorder {
    type Error = Infallible;

    fn equal(&mut self, old_index: usize, new_index: usize, len: usize) -> Result<(), Infallible> {
        let (old_index, new_index) = (old_index + self.old_offset, new_index + self.new_offset);
        self.kept
            .extend((0..len).map(|offset| (old_index + offset, new_index + offset)));
        Ok(())
    }

    fn delete(&mut self, old_index: usize, old_len: usize, _new_index: usize) -> Result<(), Infallible> {
        let old_index = old_index + self.old_offset;
        self.deleted.extend(old_index..old_index + old_len);
        Ok(())
    }

    fn insert(&mut self, _old_index: usize, new_index: usize, new_len: usize) -> Result<(), Infallible> {
        let new_index = new_index + self.new_offset;
        self.inserted.extend(new_index..new_index + new_len);
        Ok(())
    }
}

/// Length of the common prefix, and of the common suffix of what remains.
fn common_ends<T: PartialEq>(old: &[T], new: &[T]) -> (usize, usize) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    (prefix, suffix)
}

/// Align `old` against `new`.
///
/// The common prefix and suffix are kept outright. Only the middle of each
/// side goes through the alignment algorithm, addressed from zero.
pub fn align<T: PartialEq>(old: &[T], new: &[T], options: &DiffOptions) -> Alignment {
    let (prefix, suffix) = common_ends(old, new);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut recorder = Recorder {
        old_offset: prefix,
        new_offset: prefix,
        kept: (0..prefix).map(|i| (i, i)).collect(),
        ..Recorder::default()
    };
    let outcome = match options.algorithm {
        Algorithm::Lcs => lcs::diff(
            &mut recorder,
            old_mid,
            0..old_mid.len(),
            new_mid,
            0..new_mid.len(),
        ),
        Algorithm::Myers => myers::diff(
            &mut recorder,
            old_mid,
            0..old_mid.len(),
            new_mid,
            0..new_mid.len(),
        ),
    };
    match outcome {
        Ok(()) => {}
        Err(never) => match never {},
    }

    let Recorder {
        mut kept,
        mut deleted,
        mut inserted,
        ..
    } = recorder;
    let (old_tail, new_tail) = (old.len() - suffix, new.len() - suffix);
    kept.extend((0..suffix).map(|i| (old_tail + i, new_tail + i)));
    kept.sort_unstable();
    deleted.sort_unstable();
    inserted.sort_unstable();

    let moved = if options.detect_moves {
        coalesce_moves(old, new, &mut deleted, &mut inserted)
    } else {
        Vec::new()
    };

    trace!(
        old_len = old.len(),
        new_len = new.len(),
        kept = kept.len(),
        deleted = deleted.len(),
        inserted = inserted.len(),
        moved = moved.len(),
        algorithm = %options.algorithm,
        "aligned sequences"
    );

    Alignment {
        kept,
        deleted,
        inserted,
        moved,
    }
}

/// Pair each deleted element, in ascending old order, with the first
/// unpaired inserted element equal to it. Paired indices leave `deleted`
/// and `inserted` and are returned as moves.
fn coalesce_moves<T: PartialEq>(
    old: &[T],
    new: &[T],
    deleted: &mut Vec<usize>,
    inserted: &mut Vec<usize>,
) -> Vec<(usize, usize)> {
    let mut paired = vec![false; inserted.len()];
    let mut moves = Vec::new();
    let mut unpaired = Vec::with_capacity(deleted.len());

    for &from in deleted.iter() {
        let candidate = inserted
            .iter()
            .enumerate()
            .find(|&(k, &to)| !paired[k] && new[to] == old[from])
            .map(|(k, _)| k);
        match candidate {
            Some(k) => {
                paired[k] = true;
                moves.push((from, inserted[k]));
            }
            None => unpaired.push(from),
        }
    }

    *deleted = unpaired;
    *inserted = inserted
        .iter()
        .zip(paired)
        .filter(|(_, paired)| !paired)
        .map(|(&to, _)| to)
        .collect();
    moves
}

/// Compute the edit script from `old` to `new` with default options
/// (exact LCS, move detection on).
pub fn diff<T: PartialEq + Clone>(old: &[T], new: &[T]) -> EditScript<T> {
    diff_with(old, new, &DiffOptions::default())
}

/// Compute the edit script from `old` to `new`.
pub fn diff_with<T: PartialEq + Clone>(old: &[T], new: &[T], options: &DiffOptions) -> EditScript<T> {
    let alignment = align(old, new, options);
    script_from_alignment(&alignment, new)
}

/// Turn an alignment into an ordered script: deletes, inserts, moves.
pub fn script_from_alignment<T: Clone>(alignment: &Alignment, new: &[T]) -> EditScript<T> {
    let deletes = alignment.deleted.iter().map(|&at| EditOp::Delete { at });
    let inserts = alignment.inserted.iter().map(|&at| EditOp::Insert {
        at,
        element: new[at].clone(),
    });
    let moves = alignment
        .moved
        .iter()
        .map(|&(from, to)| EditOp::Move { from, to });
    EditScript {
        ops: deletes.chain(inserts).chain(moves).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reference LCS length by the textbook table.
    fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
        let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for i in (0..a.len()).rev() {
            for j in (0..b.len()).rev() {
                table[i][j] = if a[i] == b[j] {
                    table[i + 1][j + 1] + 1
                } else {
                    table[i + 1][j].max(table[i][j + 1])
                };
            }
        }
        table[0][0]
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn empty_old_is_all_inserts() {
        let script = diff(&[], &chars("abc"));
        assert_eq!(script.insertions(), 3);
        assert_eq!(script.deletions(), 0);
        assert_eq!(script.apply(&[]).unwrap(), chars("abc"));
    }

    #[test]
    fn empty_new_is_all_deletes() {
        let script = diff(&chars("abc"), &[]);
        assert_eq!(
            script.ops,
            vec![
                EditOp::Delete { at: 0 },
                EditOp::Delete { at: 1 },
                EditOp::Delete { at: 2 }
            ]
        );
    }

    #[test]
    fn both_empty() {
        let script: EditScript<char> = diff(&[], &[]);
        assert!(script.is_empty());
    }

    #[test]
    fn single_insert_in_middle() {
        let script = diff(&[1, 2, 3], &[1, 9, 2, 3]);
        assert_eq!(script.ops, vec![EditOp::Insert { at: 1, element: 9 }]);
    }

    #[test]
    fn replacement_is_delete_plus_insert() {
        let script = diff(&chars("abc"), &chars("axc"));
        assert_eq!(
            script.ops,
            vec![EditOp::Delete { at: 1 }, EditOp::Insert { at: 1, element: 'x' }]
        );
    }

    #[test]
    fn relocated_element_becomes_move() {
        // "a" travels from the front to the back; "b c" is the common run.
        let script = diff(&chars("abc"), &chars("bca"));
        assert_eq!(script.ops, vec![EditOp::Move { from: 0, to: 2 }]);

        let baseline = diff_with(&chars("abc"), &chars("bca"), &DiffOptions::baseline());
        assert_eq!(
            baseline.ops,
            vec![EditOp::Delete { at: 0 }, EditOp::Insert { at: 2, element: 'a' }]
        );
    }

    #[test]
    fn ordering_is_deletes_inserts_moves() {
        let old = chars("abcdef");
        let new = chars("fbxdey");
        let script = diff(&old, &new);
        let rank = |op: &EditOp<char>| match op {
            EditOp::Delete { .. } => 0,
            EditOp::Insert { .. } => 1,
            EditOp::Move { .. } => 2,
        };
        let ranks: Vec<_> = script.ops.iter().map(rank).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
        assert_eq!(script.apply(&old).unwrap(), new);
    }

    #[test]
    fn duplicates_pair_leftmost_first() {
        let old = chars("xaa");
        let new = chars("aax");
        let alignment = align(&old, &new, &DiffOptions::default());
        assert_eq!(alignment.moved, vec![(0, 2)]);
        assert!(alignment.deleted.is_empty());
        assert!(alignment.inserted.is_empty());
    }

    #[test]
    fn matched_covers_kept_and_moved() {
        let alignment = align(&chars("abc"), &chars("cab"), &DiffOptions::default());
        let matched = alignment.matched();
        assert_eq!(matched.len(), 3);
        let news: Vec<_> = matched.iter().map(|&(_, n)| n).collect();
        assert_eq!(news, vec![0, 1, 2]);
        assert!(!alignment.is_identity());
    }

    #[test]
    fn shared_prefix_keeps_script_minimal() {
        let old = [3, 1, 0];
        let new = [3, 2, 1];
        for algorithm in [Algorithm::Lcs, Algorithm::Myers] {
            let baseline = diff_with(&old, &new, &DiffOptions::baseline().with_algorithm(algorithm));
            assert_eq!(
                baseline.ops,
                vec![EditOp::Delete { at: 2 }, EditOp::Insert { at: 1, element: 2 }]
            );

            // Nothing moved, so move detection must not invent one.
            let script = diff_with(&old, &new, &DiffOptions::default().with_algorithm(algorithm));
            assert_eq!(script, baseline);
        }
    }

    #[test]
    fn shared_prefix_and_suffix_are_kept() {
        let alignment = align(&chars("abXYcd"), &chars("abZcd"), &DiffOptions::default());
        assert_eq!(alignment.kept, vec![(0, 0), (1, 1), (4, 3), (5, 4)]);
        assert_eq!(alignment.deleted, vec![2, 3]);
        assert_eq!(alignment.inserted, vec![2]);
    }

    #[test]
    fn myers_round_trips() {
        let options = DiffOptions::default().with_algorithm(Algorithm::Myers);
        let old = chars("the quick brown fox");
        let new = chars("quick the fox brown!");
        let script = diff_with(&old, &new, &options);
        assert_eq!(script.apply(&old).unwrap(), new);
    }

    fn seq() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(0u8..5, 0..14)
    }

    proptest! {
        #[test]
        fn round_trip(a in seq(), b in seq()) {
            for algorithm in [Algorithm::Lcs, Algorithm::Myers] {
                for detect_moves in [false, true] {
                    let options = DiffOptions { algorithm, detect_moves };
                    let script = diff_with(&a, &b, &options);
                    prop_assert_eq!(script.apply(&a).unwrap(), b.clone());
                }
            }
        }

        #[test]
        fn baseline_is_minimal(a in seq(), b in seq()) {
            for algorithm in [Algorithm::Lcs, Algorithm::Myers] {
                let options = DiffOptions::baseline().with_algorithm(algorithm);
                let script = diff_with(&a, &b, &options);
                prop_assert_eq!(script.moves(), 0);
                prop_assert_eq!(script.len(), a.len() + b.len() - 2 * lcs_len(&a, &b));
            }
        }

        #[test]
        fn kept_pairs_hold_equal_elements(a in seq(), b in seq()) {
            for algorithm in [Algorithm::Lcs, Algorithm::Myers] {
                let options = DiffOptions::baseline().with_algorithm(algorithm);
                let alignment = align(&a, &b, &options);
                prop_assert_eq!(alignment.kept.len(), lcs_len(&a, &b));
                for &(old, new) in &alignment.kept {
                    prop_assert_eq!(a[old], b[new]);
                }
            }
        }

        #[test]
        fn moves_never_grow_the_script(a in seq(), b in seq()) {
            let baseline = diff_with(&a, &b, &DiffOptions::baseline());
            let extended = diff(&a, &b);
            prop_assert!(extended.len() <= baseline.len());
            prop_assert_eq!(
                extended.deletions() + extended.moves(),
                baseline.deletions()
            );
        }

        #[test]
        fn deterministic(a in seq(), b in seq()) {
            prop_assert_eq!(diff(&a, &b), diff(&a, &b));
        }

        #[test]
        fn self_diff_is_empty(a in seq()) {
            prop_assert!(diff(&a, &a).is_empty());
            prop_assert!(align(&a, &a, &DiffOptions::default()).is_identity());
        }
    }
}
