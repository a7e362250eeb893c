use sectioned_diff::DiffOptions;
use serde::{Deserialize, Serialize};

/// Configuration for an [`ObservableCollection`](crate::ObservableCollection).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Label attached to every log record of this collection.
    pub label: String,
    /// Options used when a replacement is diffed.
    pub diff: DiffOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label: "collection".into(),
            diff: DiffOptions::default(),
        }
    }
}

impl StoreConfig {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_diff(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }
}
