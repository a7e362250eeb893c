//! Diff engine for sectioned collections.
//!
//! Computes minimal edit scripts between ordered sequences and combines
//! them into a two-level (sections, then items) change stream that a
//! consumer can replay to reach the new collection.
//!
//! # Key Types
//!
//! - [`EditScript`] / [`EditOp`] -- Insert/delete/move script for one sequence
//! - [`Alignment`] -- Raw kept/deleted/inserted/moved index sets
//! - [`CollectionDiff`] -- Section- and item-level result of a collection diff
//! - [`DiffOptions`] / [`Algorithm`] -- Engine configuration

pub mod config;
pub mod edit_script;
pub mod engine;
pub mod error;
pub mod patch;
pub mod sections;

pub use config::{Algorithm, DiffOptions};
pub use edit_script::{EditOp, EditScript};
pub use engine::{align, diff, diff_with, script_from_alignment, Alignment};
pub use error::{DiffError, DiffResult};
pub use patch::{apply_batch, apply_change};
pub use sections::{diff_collections, diff_section_items, CollectionDiff, SectionMatch};
