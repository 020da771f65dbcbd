//! Per-entry parse outcome.

use serde::{Deserialize, Serialize};

/// The outcome of attempting to parse one archive entry.
///
/// Always produced, even on failure: a corrupt entry becomes a
/// `SearchedFile` with an error instead of aborting its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchedFile {
    /// Name of the entry inside the archive (or the bare file).
    pub file_name: String,
    /// Records that passed the filter and reached reporters.
    pub accepted: u64,
    /// Records rejected by the filter.
    pub filtered: u64,
    /// Why parsing failed; `None` on success.
    pub error: Option<String>,
}

impl SearchedFile {
    /// Outcome of a successful parse.
    pub fn success(file_name: impl Into<String>, accepted: u64, filtered: u64) -> Self {
        Self { file_name: file_name.into(), accepted, filtered, error: None }
    }

    /// Outcome of a failed parse. Counts are zero.
    pub fn failure(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self { file_name: file_name.into(), accepted: 0, filtered: 0, error: Some(error.into()) }
    }

    /// Whether the entry parsed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Total lines decoded, accepted or not.
    pub fn total(&self) -> u64 {
        self.accepted + self.filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_failure() {
        let ok = SearchedFile::success("queries.json", 10, 2);
        assert!(ok.is_success());
        assert_eq!(ok.total(), 12);

        let bad = SearchedFile::failure("queries.json.gz", "bad magic");
        assert!(!bad.is_success());
        assert_eq!(bad.accepted, 0);
        assert_eq!(bad.filtered, 0);
        assert_eq!(bad.error.as_deref(), Some("bad magic"));
    }
}
