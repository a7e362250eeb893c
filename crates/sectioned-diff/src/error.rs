//! Error types for the diff crate.

use sectioned_types::{ChangeKind, CollectionError};

/// Errors raised while applying an edit script or a change batch.
///
/// Computing a diff never fails; only applying a malformed script or batch
/// to a local structure does.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// An index lies outside the sequence it addresses.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A source index was removed or moved more than once.
    #[error("index {0} listed more than once")]
    DuplicateIndex(usize),

    /// Two operations target the same destination slot.
    #[error("target slot {0} filled more than once")]
    SlotConflict(usize),

    /// A batch addresses a section that it removed or never had.
    #[error("batch references unknown section {0}")]
    UnknownSection(usize),

    /// `BeginBatch` / `EndBatch` markers are missing, nested, or misplaced.
    #[error("unbalanced batch markers")]
    UnbalancedBatch,

    /// The change cannot be applied in this position.
    #[error("unexpected {0} change")]
    UnexpectedChange(ChangeKind),

    /// A collection edit failed.
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
