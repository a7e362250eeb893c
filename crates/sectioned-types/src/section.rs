use serde::{Deserialize, Serialize};

/// One section of a collection: opaque metadata and an ordered item list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section<M, T> {
    pub metadata: M,
    pub items: Vec<T>,
}

impl<M, T> Section<M, T> {
    /// Create an empty section.
    pub fn new(metadata: M) -> Self {
        Self {
            metadata,
            items: Vec::new(),
        }
    }

    /// Create a section holding `items`.
    pub fn with_items(metadata: M, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            metadata,
            items: items.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
