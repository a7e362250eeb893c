//! A consumer-side copy kept in step by replaying events.

use sectioned_diff::{apply_batch, apply_change};
use sectioned_types::{Change, Collection};
use tracing::trace;

use crate::error::StoreResult;
use crate::event::{ChangeEvent, EventOrigin, Snapshot};

/// Local copy of an observed collection.
///
/// Feed it every event an observer receives, in order. Edit events are
/// replayed one at a time. The events of a diff run are buffered and
/// replayed together once the run is complete, because their indices are
/// grouped rather than sequential.
#[derive(Debug)]
pub struct Mirror<M, T> {
    local: Collection<M, T>,
    pending: Vec<Change>,
    pending_source: Option<Snapshot<M, T>>,
}

impl<M: Clone, T: Clone> Mirror<M, T> {
    pub fn new() -> Self {
        Self {
            local: Collection::new(),
            pending: Vec::new(),
            pending_source: None,
        }
    }

    /// The replayed state. Lags behind while a diff run is buffered.
    pub fn collection(&self) -> &Collection<M, T> {
        &self.local
    }

    /// `true` when no diff run is waiting to be replayed.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Replay one event.
    pub fn handle(&mut self, event: &ChangeEvent<M, T>) -> StoreResult<()> {
        let run_ended = match &self.pending_source {
            Some(source) => {
                event.origin != EventOrigin::Diff
                    || source.generation() != event.snapshot.generation()
            }
            None => false,
        };
        if run_ended {
            self.flush()?;
        }

        match event.origin {
            EventOrigin::Diff => {
                self.pending.push(event.change.clone());
                self.pending_source = Some(event.snapshot.clone());
                if event.change == Change::EndBatch {
                    self.flush()?;
                }
            }
            EventOrigin::Subscription | EventOrigin::Edit => {
                apply_change(&mut self.local, &event.change, &event.snapshot)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        let Some(source) = self.pending_source.take() else {
            return Ok(());
        };
        let changes = std::mem::take(&mut self.pending);
        trace!(
            changes = changes.len(),
            generation = source.generation(),
            "replaying diff run"
        );
        self.local = apply_batch(&self.local, &changes, &source)?;
        Ok(())
    }
}

impl<M: Clone, T: Clone> Default for Mirror<M, T> {
    fn default() -> Self {
        Self::new()
    }
}
