//! The observable collection.
//!
//! All mutation and notification for one collection happens under a single
//! re-entrant lock, so a thread may nest mutators (for example inside
//! [`ObservableCollection::batch`]) while other threads wait their turn.
//! Observers run on the mutating thread while the lock is held: they must
//! not block for long, and any attempt to mutate the collection from inside
//! an observer fails with [`StoreError::ReentrantMutation`].

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, trace};

use sectioned_diff::{diff_collections, diff_section_items};
use sectioned_types::{Change, Collection, CollectionResult, Location, Section};

use crate::channel::{deliver, NotificationChannel, Observer, SubscriptionId};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::event::{ChangeEvent, EventOrigin, Snapshot};

struct Inner<M, T> {
    state: Arc<Collection<M, T>>,
    generation: u64,
    channel: NotificationChannel<M, T>,
    batch_depth: usize,
    notifying: bool,
    config: StoreConfig,
}

impl<M, T> Inner<M, T> {
    fn snapshot(&self) -> Snapshot<M, T> {
        Snapshot::new(self.generation, Arc::clone(&self.state))
    }

    fn event(&self, change: Change, origin: EventOrigin) -> ChangeEvent<M, T> {
        ChangeEvent {
            change,
            origin,
            snapshot: self.snapshot(),
        }
    }

    fn ensure_not_notifying(&self) -> StoreResult<()> {
        if self.notifying {
            Err(StoreError::ReentrantMutation)
        } else {
            Ok(())
        }
    }
}

/// Clears the `notifying` flag when delivery ends, even by unwinding.
struct NotifyingScope<'a, M, T>(&'a RefCell<Inner<M, T>>);

impl<M, T> Drop for NotifyingScope<'_, M, T> {
    fn drop(&mut self) {
        self.0.borrow_mut().notifying = false;
    }
}

/// Closes the current batch when [`ObservableCollection::batch`] returns or
/// unwinds, emitting `EndBatch` once the outermost batch ends.
struct BatchScope<'a, M, T>
where
    M: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    store: &'a ObservableCollection<M, T>,
    cell: &'a RefCell<Inner<M, T>>,
}

impl<M, T> Drop for BatchScope<'_, M, T>
where
    M: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    fn drop(&mut self) {
        let end = match self.cell.try_borrow_mut() {
            Ok(mut inner) => {
                inner.batch_depth = inner.batch_depth.saturating_sub(1);
                (inner.batch_depth == 0).then(|| inner.event(Change::EndBatch, EventOrigin::Edit))
            }
            Err(_) => None,
        };
        if let Some(event) = end {
            self.store.notify(self.cell, &[event]);
        }
    }
}

/// A sectioned collection that reports every structural change to its
/// observers.
pub struct ObservableCollection<M, T> {
    inner: ReentrantMutex<RefCell<Inner<M, T>>>,
}

impl<M, T> ObservableCollection<M, T>
where
    M: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    /// Create an empty collection with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Collection::new(), StoreConfig::default())
    }

    /// Create a collection holding `collection`.
    pub fn with_collection(collection: Collection<M, T>) -> Self {
        Self::with_config(collection, StoreConfig::default())
    }

    pub fn with_config(collection: Collection<M, T>, config: StoreConfig) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                state: Arc::new(collection),
                generation: 0,
                channel: NotificationChannel::new(),
                batch_depth: 0,
                notifying: false,
                config,
            })),
        }
    }

    // ---- reads ----

    /// The current state as an immutable snapshot.
    pub fn snapshot(&self) -> Snapshot<M, T> {
        self.inner.lock().borrow().snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().borrow().generation
    }

    pub fn config(&self) -> StoreConfig {
        self.inner.lock().borrow().config.clone()
    }

    pub fn section_count(&self) -> usize {
        self.snapshot().section_count()
    }

    pub fn total_items(&self) -> usize {
        self.snapshot().total_items()
    }

    pub fn item_count(&self, section: usize) -> StoreResult<usize> {
        Ok(self.snapshot().section(section)?.len())
    }

    /// The item at `location`. Fails if either index is out of bounds.
    pub fn get(&self, location: Location) -> StoreResult<T> {
        Ok(self.snapshot().item(location)?.clone())
    }

    pub fn section(&self, index: usize) -> StoreResult<Section<M, T>> {
        Ok(self.snapshot().section(index)?.clone())
    }

    pub fn metadata(&self, index: usize) -> StoreResult<M> {
        Ok(self.snapshot().section(index)?.metadata.clone())
    }

    // ---- item edits ----

    /// Append `item` to section `section`.
    pub fn append_item(&self, section: usize, item: T) -> StoreResult<Location> {
        self.edit(|c| {
            let at = Location::new(section, c.section(section)?.len());
            let locations = c.insert_items(at, vec![item])?;
            Ok((at, Some(Change::InsertItems(locations))))
        })
    }

    /// Append `items` to section `section`.
    pub fn append_items(&self, section: usize, items: Vec<T>) -> StoreResult<Vec<Location>> {
        self.edit(|c| {
            let locations = c.append_items(section, items)?;
            let change = (!locations.is_empty()).then(|| Change::InsertItems(locations.clone()));
            Ok((locations, change))
        })
    }

    /// Insert `item` so that it ends up at `at`.
    pub fn insert_item(&self, item: T, at: Location) -> StoreResult<()> {
        self.edit(|c| {
            let locations = c.insert_items(at, vec![item])?;
            Ok(((), Some(Change::InsertItems(locations))))
        })
    }

    /// Insert `items` consecutively starting at `at`.
    pub fn insert_items(&self, items: Vec<T>, at: Location) -> StoreResult<Vec<Location>> {
        self.edit(|c| {
            let locations = c.insert_items(at, items)?;
            let change = (!locations.is_empty()).then(|| Change::InsertItems(locations.clone()));
            Ok((locations, change))
        })
    }

    pub fn remove_item(&self, at: Location) -> StoreResult<T> {
        self.edit(|c| {
            let item = c.remove_item(at)?;
            Ok((item, Some(Change::DeleteItems(vec![at]))))
        })
    }

    /// Remove the items at `locations`, all addressed before any removal.
    /// Returns the removed items in location order.
    pub fn remove_items(&self, locations: &[Location]) -> StoreResult<Vec<T>> {
        self.edit(|c| {
            let (sorted, items) = c.remove_items(locations)?;
            let change = (!sorted.is_empty()).then(|| Change::DeleteItems(sorted));
            Ok((items, change))
        })
    }

    /// Empty every section, keeping the sections. Returns the number of
    /// items removed.
    pub fn remove_all_items(&self) -> StoreResult<usize> {
        self.edit(|c| {
            let locations = c.clear_items();
            let count = locations.len();
            let change = (count > 0).then(|| Change::DeleteItems(locations));
            Ok((count, change))
        })
    }

    /// Move the item at `from` so that it ends up at `to`. Sections may
    /// differ.
    pub fn move_item(&self, from: Location, to: Location) -> StoreResult<()> {
        self.edit(|c| {
            if from == to {
                c.check_location(from)?;
                return Ok(((), None));
            }
            c.move_item(from, to)?;
            Ok(((), Some(Change::MoveItem { from, to })))
        })
    }

    /// Replace the item at `at`, returning the previous value.
    pub fn replace_item(&self, at: Location, item: T) -> StoreResult<T> {
        self.edit(|c| {
            let previous = c.replace_item(at, item)?;
            Ok((previous, Some(Change::UpdateItems(vec![at]))))
        })
    }

    // ---- section edits ----

    pub fn append_section(&self, section: Section<M, T>) -> StoreResult<usize> {
        self.edit(|c| {
            let index = c.push_section(section);
            Ok((index, Some(Change::InsertSections(vec![index]))))
        })
    }

    pub fn insert_section(&self, section: Section<M, T>, at: usize) -> StoreResult<()> {
        self.insert_sections(vec![section], at).map(|_| ())
    }

    pub fn insert_sections(&self, sections: Vec<Section<M, T>>, at: usize) -> StoreResult<Vec<usize>> {
        self.edit(|c| {
            let indices = c.insert_sections(at, sections)?;
            let change = (!indices.is_empty()).then(|| Change::InsertSections(indices.clone()));
            Ok((indices, change))
        })
    }

    pub fn remove_section(&self, at: usize) -> StoreResult<Section<M, T>> {
        self.edit(|c| {
            let section = c.remove_section(at)?;
            Ok((section, Some(Change::DeleteSections(vec![at]))))
        })
    }

    /// Remove every section. Returns the number of sections removed.
    pub fn remove_all_sections(&self) -> StoreResult<usize> {
        self.edit(|c| {
            let indices = c.clear();
            let count = indices.len();
            let change = (count > 0).then(|| Change::DeleteSections(indices));
            Ok((count, change))
        })
    }

    pub fn move_section(&self, from: usize, to: usize) -> StoreResult<()> {
        self.edit(|c| {
            if from == to {
                c.check_section(from)?;
                return Ok(((), None));
            }
            c.move_section(from, to)?;
            Ok(((), Some(Change::MoveSection { from, to })))
        })
    }

    /// Replace a whole section, returning the previous one.
    pub fn replace_section(&self, at: usize, section: Section<M, T>) -> StoreResult<Section<M, T>> {
        self.edit(|c| {
            let previous = c.replace_section(at, section)?;
            Ok((previous, Some(Change::UpdateSections(vec![at]))))
        })
    }

    /// Replace a section's metadata, returning the previous value.
    pub fn set_metadata(&self, at: usize, metadata: M) -> StoreResult<M> {
        self.edit(|c| {
            let previous = c.set_metadata(at, metadata)?;
            Ok((previous, Some(Change::UpdateSections(vec![at]))))
        })
    }

    // ---- bulk edits ----

    /// Replace the whole collection.
    ///
    /// With `diff`, observers receive the section diff of old against new as
    /// one batch. Without it they receive a single `Reset`.
    pub fn replace_all(&self, collection: Collection<M, T>, diff: bool) -> StoreResult<()> {
        let guard = self.inner.lock();
        let events = {
            let mut inner = guard.borrow_mut();
            inner.ensure_not_notifying()?;
            let old = std::mem::replace(&mut inner.state, Arc::new(collection));
            inner.generation += 1;

            if diff {
                let result = diff_collections(&old, &inner.state, &inner.config.diff);
                debug!(
                    collection = %inner.config.label,
                    generation = inner.generation,
                    operations = result.operation_count(),
                    "replaced collection with diff"
                );
                let changes = if inner.batch_depth > 0 {
                    result.structural_changes()
                } else {
                    result.changes()
                };
                changes
                    .into_iter()
                    .map(|change| inner.event(change, EventOrigin::Diff))
                    .collect()
            } else {
                debug!(
                    collection = %inner.config.label,
                    generation = inner.generation,
                    "replaced collection"
                );
                vec![inner.event(Change::Reset, EventOrigin::Edit)]
            }
        };
        self.notify(&guard, &events);
        Ok(())
    }

    /// Replace the items of one section, keeping its metadata.
    ///
    /// With `diff`, observers receive the item diff as one batch. Without it
    /// they receive `UpdateSections([section])`.
    pub fn replace_items(&self, section: usize, items: Vec<T>, diff: bool) -> StoreResult<()> {
        let guard = self.inner.lock();
        let events = {
            let mut inner = guard.borrow_mut();
            inner.ensure_not_notifying()?;
            inner.state.check_section(section)?;
            let old_items = Arc::make_mut(&mut inner.state).replace_items(section, items)?;
            inner.generation += 1;

            if diff {
                let new_items = &inner.state.section(section)?.items;
                let result = diff_section_items(section, &old_items, new_items, &inner.config.diff);
                let changes = if inner.batch_depth > 0 {
                    result.structural_changes()
                } else {
                    result.changes()
                };
                changes
                    .into_iter()
                    .map(|change| inner.event(change, EventOrigin::Diff))
                    .collect()
            } else {
                vec![inner.event(Change::UpdateSections(vec![section]), EventOrigin::Edit)]
            }
        };
        self.notify(&guard, &events);
        Ok(())
    }

    /// Run `f` as one batch: observers see `BeginBatch`, the events of every
    /// mutation `f` performs, then `EndBatch`.
    ///
    /// Nested batches collapse into the outermost one. `EndBatch` is sent
    /// even if `f` fails; mutations that succeeded before the failure stay
    /// applied.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> StoreResult<R>) -> StoreResult<R> {
        let guard = self.inner.lock();
        let begin = {
            let mut inner = guard.borrow_mut();
            inner.ensure_not_notifying()?;
            inner.batch_depth += 1;
            (inner.batch_depth == 1).then(|| inner.event(Change::BeginBatch, EventOrigin::Edit))
        };
        let scope = BatchScope {
            store: self,
            cell: &guard,
        };
        if let Some(event) = begin {
            self.notify(&guard, &[event]);
        }

        let result = f(self);
        drop(scope);
        result
    }

    // ---- silent edits ----

    /// Replace the whole collection without notifying anyone. Intended for
    /// filling a collection before its first observer subscribes.
    pub fn set_silently(&self, collection: Collection<M, T>) -> StoreResult<()> {
        self.mutate_silently(|c| *c = collection)
    }

    /// Edit the collection in place without notifying anyone.
    pub fn mutate_silently<R>(&self, f: impl FnOnce(&mut Collection<M, T>) -> R) -> StoreResult<R> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.ensure_not_notifying()?;
        let result = f(Arc::make_mut(&mut inner.state));
        inner.generation += 1;
        trace!(collection = %inner.config.label, generation = inner.generation, "silent edit");
        Ok(result)
    }

    // ---- observers ----

    /// Register `observer`. It first receives a `Reset` carrying the current
    /// state, then every later event. Inside a batch the `Reset` is followed
    /// by a `BeginBatch`, so the observer sees the batch's `EndBatch` paired.
    pub fn subscribe<F>(&self, observer: F) -> StoreResult<SubscriptionId>
    where
        F: Fn(&ChangeEvent<M, T>) + Send + Sync + 'static,
    {
        let guard = self.inner.lock();
        let observer: Observer<M, T> = Arc::new(observer);
        let greeting = {
            let inner = guard.borrow();
            inner.ensure_not_notifying()?;
            let mut events = vec![inner.event(Change::Reset, EventOrigin::Subscription)];
            if inner.batch_depth > 0 {
                events.push(inner.event(Change::BeginBatch, EventOrigin::Edit));
            }
            events
        };
        self.deliver_to(&guard, std::slice::from_ref(&observer), &greeting);

        let mut inner = guard.borrow_mut();
        let id = inner.channel.subscribe(observer);
        debug!(
            collection = %inner.config.label,
            %id,
            subscribers = inner.channel.subscriber_count(),
            "observer subscribed"
        );
        Ok(id)
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let removed = inner.channel.unsubscribe(id);
        debug!(collection = %inner.config.label, %id, removed, "observer unsubscribed");
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().borrow().channel.subscriber_count()
    }

    // ---- internals ----

    /// Apply `f` to the state and notify observers of the change it reports.
    /// `f` must leave the state untouched when it fails.
    fn edit<R>(
        &self,
        f: impl FnOnce(&mut Collection<M, T>) -> CollectionResult<(R, Option<Change>)>,
    ) -> StoreResult<R> {
        let guard = self.inner.lock();
        let (result, event) = {
            let mut inner = guard.borrow_mut();
            inner.ensure_not_notifying()?;
            let (result, change) = f(Arc::make_mut(&mut inner.state))?;
            let event = change.map(|change| {
                inner.generation += 1;
                debug!(
                    collection = %inner.config.label,
                    generation = inner.generation,
                    kind = %change.kind(),
                    "applied edit"
                );
                inner.event(change, EventOrigin::Edit)
            });
            (result, event)
        };
        if let Some(event) = event {
            self.notify(&guard, std::slice::from_ref(&event));
        }
        Ok(result)
    }

    fn notify(&self, cell: &RefCell<Inner<M, T>>, events: &[ChangeEvent<M, T>]) {
        let observers = cell.borrow().channel.observers();
        self.deliver_to(cell, &observers, events);
    }

    fn deliver_to(
        &self,
        cell: &RefCell<Inner<M, T>>,
        observers: &[Observer<M, T>],
        events: &[ChangeEvent<M, T>],
    ) {
        {
            let mut inner = cell.borrow_mut();
            inner.notifying = true;
            for event in events {
                trace!(
                    collection = %inner.config.label,
                    change = %event.change,
                    generation = event.snapshot.generation(),
                    observers = observers.len(),
                    "emitting change"
                );
            }
        }
        let _scope = NotifyingScope(cell);
        deliver(observers, events);
    }
}

impl<M, T> Default for ObservableCollection<M, T>
where
    M: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, T> std::fmt::Debug for ObservableCollection<M, T>
where
    M: std::fmt::Debug,
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        let result = match guard.try_borrow() {
            Ok(inner) => f
                .debug_struct("ObservableCollection")
                .field("label", &inner.config.label)
                .field("generation", &inner.generation)
                .field("state", &inner.state)
                .field("channel", &inner.channel)
                .finish(),
            Err(_) => f.write_str("ObservableCollection { <borrowed> }"),
        };
        result
    }
}
