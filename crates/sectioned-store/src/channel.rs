//! Observer registry and in-order fan-out.

use std::sync::Arc;

use crate::event::ChangeEvent;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// An observer callback.
pub type Observer<M, T> = Arc<dyn Fn(&ChangeEvent<M, T>) + Send + Sync>;

/// Registered observers, in subscription order.
///
/// The channel does no locking of its own; the owning collection
/// serializes access to it.
pub struct NotificationChannel<M, T> {
    subscribers: Vec<(SubscriptionId, Observer<M, T>)>,
    next_id: u64,
}

impl<M, T> NotificationChannel<M, T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register `observer` for future events.
    pub fn subscribe(&mut self, observer: Observer<M, T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, observer));
        id
    }

    /// Remove an observer. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The current observers, in subscription order.
    pub fn observers(&self) -> Vec<Observer<M, T>> {
        self.subscribers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl<M, T> Default for NotificationChannel<M, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, T> std::fmt::Debug for NotificationChannel<M, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Deliver `events` to each observer, event by event.
pub(crate) fn deliver<M, T>(observers: &[Observer<M, T>], events: &[ChangeEvent<M, T>]) {
    for event in events {
        for observer in observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Observer<(), ()> {
        let counter = Arc::clone(counter);
        Arc::new(move |_event: &ChangeEvent<(), ()>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn ids_are_unique_and_displayable() {
        let mut channel = NotificationChannel::<(), ()>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = channel.subscribe(counting(&counter));
        let b = channel.subscribe(counting(&counter));
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "sub:0");
        assert_eq!(channel.subscriber_count(), 2);
    }

    #[test]
    fn unsubscribe_removes_only_that_observer() {
        let mut channel = NotificationChannel::<(), ()>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = channel.subscribe(counting(&counter));
        let _b = channel.subscribe(counting(&counter));

        assert!(channel.unsubscribe(a));
        assert!(!channel.unsubscribe(a));
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(channel.observers().len(), 1);
    }

    #[test]
    fn debug_shows_counts() {
        let channel = NotificationChannel::<(), ()>::default();
        assert!(format!("{channel:?}").contains("subscribers: 0"));
    }
}
