use thiserror::Error;

use crate::location::Location;

/// Errors produced by collection access and edits.
///
/// Every fallible edit checks its arguments before touching the collection,
/// so an error always leaves the collection unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("section index {index} out of bounds (section count {count})")]
    SectionOutOfBounds { index: usize, count: usize },

    #[error("item location {location} out of bounds (section holds {count} items)")]
    ItemOutOfBounds { location: Location, count: usize },

    #[error("location {0} listed more than once")]
    DuplicateLocation(Location),
}

/// Convenience alias for collection results.
pub type CollectionResult<T> = Result<T, CollectionError>;
