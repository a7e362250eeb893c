//! Observable sectioned collections.
//!
//! [`ObservableCollection`] owns a [`Collection`](sectioned_types::Collection)
//! and tells its observers about every structural change, each paired with
//! an immutable [`Snapshot`] of the state it produced. Whole-collection and
//! whole-section replacements can be diffed so observers see fine-grained
//! inserts, deletes and moves instead of a reset.
//!
//! [`Mirror`] is the consumer side: feed it every event and it keeps a local
//! copy equal to the collection.

pub mod channel;
pub mod collection;
pub mod config;
pub mod error;
pub mod event;
pub mod mirror;

pub use channel::{NotificationChannel, Observer, SubscriptionId};
pub use collection::ObservableCollection;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use event::{ChangeEvent, EventOrigin, Snapshot};
pub use mirror::Mirror;
