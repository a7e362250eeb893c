//! Structural change notifications.
//!
//! A [`Change`] describes one structural edit at item or section
//! granularity, or a batch boundary. Index conventions:
//!
//! - Outside a diff run, every change is valid against the collection as
//!   left by the previous change: deletes address positions before the
//!   edit, inserts address positions after it.
//! - Inside a diff run (a `BeginBatch`..`EndBatch` group computed by the
//!   section diff), deletes address the old collection, inserts address the
//!   new one, section moves go old to new, and item moves are addressed at
//!   the section's new index.

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// One structural change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Change {
    /// The whole collection must be reloaded.
    Reset,
    InsertItems(Vec<Location>),
    DeleteItems(Vec<Location>),
    UpdateItems(Vec<Location>),
    MoveItem { from: Location, to: Location },
    InsertSections(Vec<usize>),
    DeleteSections(Vec<usize>),
    UpdateSections(Vec<usize>),
    MoveSection { from: usize, to: usize },
    BeginBatch,
    EndBatch,
}

impl Change {
    /// The payload-free classification of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Reset => ChangeKind::Reset,
            Self::InsertItems(_) => ChangeKind::InsertItems,
            Self::DeleteItems(_) => ChangeKind::DeleteItems,
            Self::UpdateItems(_) => ChangeKind::UpdateItems,
            Self::MoveItem { .. } => ChangeKind::MoveItem,
            Self::InsertSections(_) => ChangeKind::InsertSections,
            Self::DeleteSections(_) => ChangeKind::DeleteSections,
            Self::UpdateSections(_) => ChangeKind::UpdateSections,
            Self::MoveSection { .. } => ChangeKind::MoveSection,
            Self::BeginBatch => ChangeKind::BeginBatch,
            Self::EndBatch => ChangeKind::EndBatch,
        }
    }

    /// Returns `true` for `BeginBatch` and `EndBatch`.
    pub fn is_batch_marker(&self) -> bool {
        matches!(self, Self::BeginBatch | Self::EndBatch)
    }

    /// Returns `true` if the change carries an index list and that list is
    /// empty. Such changes are legal (a diff run always reports every
    /// category) but have no effect.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::InsertItems(l) | Self::DeleteItems(l) | Self::UpdateItems(l) => l.is_empty(),
            Self::InsertSections(i) | Self::DeleteSections(i) | Self::UpdateSections(i) => {
                i.is_empty()
            }
            _ => false,
        }
    }
}

/// Classification of changes, without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Reset,
    InsertItems,
    DeleteItems,
    UpdateItems,
    MoveItem,
    InsertSections,
    DeleteSections,
    UpdateSections,
    MoveSection,
    BeginBatch,
    EndBatch,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Reset => "Reset",
            Self::InsertItems => "InsertItems",
            Self::DeleteItems => "DeleteItems",
            Self::UpdateItems => "UpdateItems",
            Self::MoveItem => "MoveItem",
            Self::InsertSections => "InsertSections",
            Self::DeleteSections => "DeleteSections",
            Self::UpdateSections => "UpdateSections",
            Self::MoveSection => "MoveSection",
            Self::BeginBatch => "BeginBatch",
            Self::EndBatch => "EndBatch",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list<I: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, xs: &[I]) -> std::fmt::Result {
            write!(f, "[")?;
            for (i, x) in xs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{x}")?;
            }
            write!(f, "]")
        }

        write!(f, "{}", self.kind())?;
        match self {
            Self::InsertItems(l) | Self::DeleteItems(l) | Self::UpdateItems(l) => list(f, l),
            Self::InsertSections(i) | Self::DeleteSections(i) | Self::UpdateSections(i) => {
                list(f, i)
            }
            Self::MoveItem { from, to } => write!(f, " {from} -> {to}"),
            Self::MoveSection { from, to } => write!(f, " {from} -> {to}"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(ChangeKind::InsertItems.to_string(), "InsertItems");
        assert_eq!(Change::EndBatch.kind().to_string(), "EndBatch");
    }

    #[test]
    fn change_display_includes_payload() {
        let c = Change::InsertItems(vec![Location::new(0, 1), Location::new(2, 0)]);
        assert_eq!(c.to_string(), "InsertItems[(0, 1), (2, 0)]");

        let m = Change::MoveSection { from: 1, to: 0 };
        assert_eq!(m.to_string(), "MoveSection 1 -> 0");
    }

    #[test]
    fn empty_payloads() {
        assert!(Change::DeleteSections(vec![]).is_empty());
        assert!(!Change::DeleteSections(vec![0]).is_empty());
        assert!(!Change::Reset.is_empty());
        assert!(Change::BeginBatch.is_batch_marker());
        assert!(!Change::Reset.is_batch_marker());
    }

    #[test]
    fn serde_roundtrip() {
        let c = Change::MoveItem {
            from: Location::new(0, 0),
            to: Location::new(1, 3),
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: Change = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
