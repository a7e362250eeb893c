use serde::{Deserialize, Serialize};

/// The longest-common-subsequence strategy used to align two sequences.
///
/// Both produce a minimal number of inserts and deletes; they differ in
/// cost profile and in which of several equally long subsequences they keep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Exact O(N·M) table walk.
    #[default]
    Lcs,
    /// Myers' O(N·D) algorithm; cheaper when the inputs are similar.
    Myers,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lcs => write!(f, "lcs"),
            Self::Myers => write!(f, "myers"),
        }
    }
}

/// Options controlling the edit-script engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Which alignment algorithm to run.
    pub algorithm: Algorithm,
    /// Coalesce a delete and an insert of equal elements into a single move.
    pub detect_moves: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Lcs,
            detect_moves: true,
        }
    }
}

impl DiffOptions {
    /// Plain insert/delete scripts with no move detection.
    pub fn baseline() -> Self {
        Self {
            detect_moves: false,
            ..Default::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_detects_moves_with_lcs() {
        let o = DiffOptions::default();
        assert_eq!(o.algorithm, Algorithm::Lcs);
        assert!(o.detect_moves);
        assert!(!DiffOptions::baseline().detect_moves);
    }

    #[test]
    fn algorithm_display() {
        assert_eq!(Algorithm::Myers.to_string(), "myers");
        let o = DiffOptions::baseline().with_algorithm(Algorithm::Myers);
        assert_eq!(o.algorithm, Algorithm::Myers);
    }
}
