use sectioned_diff::DiffError;
use sectioned_types::CollectionError;

/// Errors produced by the observable collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A location or index was out of bounds. Nothing was changed.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// An observer callback tried to mutate the collection that is
    /// notifying it.
    #[error("collection mutated from inside one of its own observers")]
    ReentrantMutation,

    /// A mirror could not replay an event.
    #[error("replay failed: {0}")]
    Replay(#[from] DiffError),
}

/// Convenience alias used throughout the store crate.
pub type StoreResult<T> = Result<T, StoreError>;
