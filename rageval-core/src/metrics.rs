//! Retrieval quality metrics.
//!
//! Pure functions over one test case's expected and retrieved identifiers.
//! All ratios are guarded against empty inputs so they never produce NaN:
//! recall over an empty expectation is 1.0, precision over nothing retrieved is 0.0.

use serde::{Deserialize, Serialize};

use crate::retriever::RetrievedChunk;
use crate::suite::DocumentMatch;

/// Reduce a source path to the document name used for matching.
pub fn document_name(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

/// Canonical form for exact matching: forward slashes, no leading `./`, lower case.
pub fn canonical_path(id: &str) -> String {
    let mut normalized = id.trim().replace('\\', "/").to_lowercase();
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized.trim_end_matches('/').to_string()
}

impl DocumentMatch {
    /// Whether a retrieved identifier counts as a hit for an expected one.
    pub fn matches(self, expected: &str, retrieved: &str) -> bool {
        if expected.is_empty() || retrieved.is_empty() {
            return false;
        }
        match self {
            DocumentMatch::Substring => {
                retrieved.contains(expected) || expected.contains(retrieved)
            }
            DocumentMatch::Exact => {
                let e = canonical_path(expected);
                let r = canonical_path(retrieved);
                if e == r {
                    return true;
                }
                // A bare file name on either side is compared to the other's file name.
                (!e.contains('/') && e == document_name(&r))
                    || (!r.contains('/') && r == document_name(&e))
            }
        }
    }

    fn any_match<S: AsRef<str>>(self, candidates: &[S], id: &str, id_is_expected: bool) -> bool {
        candidates.iter().any(|c| {
            if id_is_expected {
                self.matches(id, c.as_ref())
            } else {
                self.matches(c.as_ref(), id)
            }
        })
    }
}

/// Fraction of retrieved documents that match an expected document.
pub fn precision<E: AsRef<str>, R: AsRef<str>>(expected: &[E], retrieved: &[R]) -> f64 {
    precision_with(DocumentMatch::Substring, expected, retrieved)
}

/// [`precision`] under an explicit matching mode.
pub fn precision_with<E: AsRef<str>, R: AsRef<str>>(
    mode: DocumentMatch,
    expected: &[E],
    retrieved: &[R],
) -> f64 {
    if retrieved.is_empty() {
        return 0.0;
    }
    let relevant = retrieved
        .iter()
        .filter(|r| mode.any_match(expected, r.as_ref(), false))
        .count();
    relevant as f64 / retrieved.len() as f64
}

/// Fraction of expected documents found among the retrieved ones.
pub fn recall<E: AsRef<str>, R: AsRef<str>>(expected: &[E], retrieved: &[R]) -> f64 {
    recall_with(DocumentMatch::Substring, expected, retrieved)
}

/// [`recall`] under an explicit matching mode.
pub fn recall_with<E: AsRef<str>, R: AsRef<str>>(
    mode: DocumentMatch,
    expected: &[E],
    retrieved: &[R],
) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let found = expected
        .iter()
        .filter(|e| mode.any_match(retrieved, e.as_ref(), true))
        .count();
    found as f64 / expected.len() as f64
}

/// Harmonic mean of precision and recall.
pub fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Keywords partitioned by whether they appear in the retrieved content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordCoverage {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

impl KeywordCoverage {
    /// Every keyword missing, used when retrieval never produced content.
    pub fn all_missing(keywords: &[String]) -> Self {
        Self {
            found: Vec::new(),
            missing: keywords.to_vec(),
        }
    }

    pub fn ratio(&self) -> f64 {
        let total = self.found.len() + self.missing.len();
        if total == 0 {
            1.0
        } else {
            self.found.len() as f64 / total as f64
        }
    }
}

/// Case-insensitive substring search of each keyword across all chunk contents.
pub fn keyword_coverage(keywords: &[String], chunks: &[RetrievedChunk]) -> KeywordCoverage {
    let haystack = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let (found, missing): (Vec<String>, Vec<String>) = keywords
        .iter()
        .cloned()
        .partition(|kw| haystack.contains(&kw.to_lowercase()));
    KeywordCoverage { found, missing }
}
