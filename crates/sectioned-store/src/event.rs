use std::ops::Deref;
use std::sync::Arc;

use sectioned_types::{Change, Collection};

/// Immutable view of a collection at one point in its history.
///
/// The generation increases by one for every state the collection passes
/// through, so two snapshots with the same generation hold the same data.
#[derive(Debug)]
pub struct Snapshot<M, T> {
    generation: u64,
    collection: Arc<Collection<M, T>>,
}

impl<M, T> Snapshot<M, T> {
    pub(crate) fn new(generation: u64, collection: Arc<Collection<M, T>>) -> Self {
        Self {
            generation,
            collection,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn collection(&self) -> &Collection<M, T> {
        &self.collection
    }
}

impl<M, T> Clone for Snapshot<M, T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            collection: Arc::clone(&self.collection),
        }
    }
}

impl<M, T> Deref for Snapshot<M, T> {
    type Target = Collection<M, T>;

    fn deref(&self) -> &Collection<M, T> {
        &self.collection
    }
}

/// What produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    /// The synthetic `Reset` sent to a new observer.
    Subscription,
    /// A direct edit, a batch transaction, or a non-diffed replacement.
    /// Indices follow sequential semantics.
    Edit,
    /// A diffed replacement. Every event of one diff run shares a snapshot
    /// generation and follows grouped semantics.
    Diff,
}

/// A change together with the collection state it produced.
#[derive(Debug)]
pub struct ChangeEvent<M, T> {
    pub change: Change,
    pub origin: EventOrigin,
    pub snapshot: Snapshot<M, T>,
}

impl<M, T> Clone for ChangeEvent<M, T> {
    fn clone(&self) -> Self {
        Self {
            change: self.change.clone(),
            origin: self.origin,
            snapshot: self.snapshot.clone(),
        }
    }
}
