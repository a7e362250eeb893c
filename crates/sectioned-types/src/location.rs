use serde::{Deserialize, Serialize};

/// Address of a single item: section index plus item index within it.
///
/// Locations order by section first, then by item, which is the order in
/// which items appear when a collection is read front to back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub section: usize,
    pub item: usize,
}

impl Location {
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.section, self.item)
    }
}
