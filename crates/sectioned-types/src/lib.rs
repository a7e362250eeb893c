//! Foundation types for sectioned collections.
//!
//! A collection is an ordered list of sections, each carrying opaque
//! metadata and an ordered list of items. Every other `sectioned-*` crate
//! depends on `sectioned-types`.
//!
//! # Key Types
//!
//! - [`Location`] -- `(section, item)` address of a single item
//! - [`Section`] -- metadata plus ordered items
//! - [`Collection`] -- ordered sections with bounds-checked access and edits
//! - [`Change`] / [`ChangeKind`] -- structural change notifications
//! - [`CollectionError`] -- out-of-bounds and malformed-argument failures

pub mod change;
pub mod collection;
pub mod error;
pub mod location;
pub mod section;

pub use change::{Change, ChangeKind};
pub use collection::Collection;
pub use error::{CollectionError, CollectionResult};
pub use location::Location;
pub use section::Section;
