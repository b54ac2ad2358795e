//! Test suite definition: gold-standard retrieval cases plus run configuration.
//!
//! Suites are authored as YAML (or JSON when the file extension is `.json`) and are
//! immutable once loaded. Every run-time tunable has a serde default so a minimal
//! suite only needs its `tests` list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::LoadError;

/// A complete retrieval test suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub test_config: TestConfig,
    #[serde(default)]
    pub tests: Vec<RetrievalTestCase>,
    /// Free-form annotations carried through to the report untouched.
    #[serde(default)]
    pub evaluation_criteria: serde_json::Value,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// One gold-standard retrieval expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalTestCase {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub expected_docs: Vec<String>,
    #[serde(default)]
    pub expected_sections: Vec<String>,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
    /// Lowest acceptable mean relevance score of the retrieved chunks.
    #[serde(default)]
    pub min_score: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Marks cases where sparse or weak results are the correct outcome.
    #[serde(default)]
    pub expect_low_confidence: bool,
}

/// How retrieved document names are compared against expected ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMatch {
    /// Either identifier contains the other.
    #[default]
    Substring,
    /// Canonicalized path equality; bare file names match on the file-name component.
    Exact,
}

/// Per-suite run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Minimum similarity passed to the retriever as a result floor.
    #[serde(default)]
    pub vector_similarity_threshold: f64,
    /// Result cap passed to the retriever for every query.
    #[serde(default = "default_max_results")]
    pub max_results_to_evaluate: usize,
    /// Per-query timeout; 0 disables the limit.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_min_precision")]
    pub min_precision: f64,
    #[serde(default = "default_min_recall")]
    pub min_recall: f64,
    /// Overall pass rate required for the run to count as healthy.
    #[serde(default = "default_required_pass_rate")]
    pub required_pass_rate: f64,
    /// Response time above which a case counts as slow.
    #[serde(default = "default_slow_response_ms")]
    pub slow_response_ms: f64,
    #[serde(default)]
    pub document_match: DocumentMatch,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            vector_similarity_threshold: 0.0,
            max_results_to_evaluate: default_max_results(),
            timeout_seconds: default_timeout_seconds(),
            min_precision: default_min_precision(),
            min_recall: default_min_recall(),
            required_pass_rate: default_required_pass_rate(),
            slow_response_ms: default_slow_response_ms(),
            document_match: DocumentMatch::default(),
        }
    }
}

fn default_max_results() -> usize {
    10
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_min_precision() -> f64 {
    0.6
}

fn default_min_recall() -> f64 {
    0.5
}

fn default_required_pass_rate() -> f64 {
    0.8
}

fn default_slow_response_ms() -> f64 {
    2000.0
}

/// Which report artifacts to produce and how much detail they carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    #[serde(default = "default_true")]
    pub include_failed_queries: bool,
    #[serde(default = "default_true")]
    pub include_score_distribution: bool,
    #[serde(default = "default_true")]
    pub include_category_breakdown: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            include_failed_queries: true,
            include_score_distribution: true,
            include_category_breakdown: true,
        }
    }
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string(), "summary".to_string()]
}

fn default_true() -> bool {
    true
}

impl TestSuite {
    /// Create an empty suite with default configuration.
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            version: default_version(),
            test_config: TestConfig::default(),
            tests: Vec::new(),
            evaluation_criteria: serde_json::Value::Null,
            reporting: ReportingConfig::default(),
        }
    }

    /// Load and validate a suite from disk.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str::<TestSuite>(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<TestSuite>(&content).map_err(|e| e.to_string())
        };
        let suite = parsed.map_err(|message| LoadError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        suite.validate()?;
        tracing::debug!(
            path = %path.display(),
            tests = suite.tests.len(),
            version = %suite.version,
            "Loaded test suite"
        );
        Ok(suite)
    }

    /// Parse a suite from a YAML string and validate it.
    pub fn from_yaml_str(content: &str) -> Result<Self, LoadError> {
        let suite: TestSuite = serde_yaml::from_str(content).map_err(|e| LoadError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        suite.validate()?;
        Ok(suite)
    }

    /// Check structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: String| Err(LoadError::Invalid { reason });

        let cfg = &self.test_config;
        if cfg.max_results_to_evaluate == 0 {
            return invalid("test_config.max_results_to_evaluate must be greater than 0".into());
        }
        for (name, value) in [
            ("min_precision", cfg.min_precision),
            ("min_recall", cfg.min_recall),
            ("required_pass_rate", cfg.required_pass_rate),
            ("vector_similarity_threshold", cfg.vector_similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("test_config.{name} must be within [0, 1], got {value}"));
            }
        }

        let mut seen = HashSet::new();
        for (idx, case) in self.tests.iter().enumerate() {
            if case.id.trim().is_empty() {
                return invalid(format!("test #{} has an empty id", idx + 1));
            }
            if case.query.trim().is_empty() {
                return invalid(format!("test '{}' has an empty query", case.id));
            }
            if !seen.insert(case.id.as_str()) {
                return invalid(format!("duplicate test id '{}'", case.id));
            }
            if !case.min_score.is_finite() {
                return invalid(format!("test '{}' has a non-finite min_score", case.id));
            }
        }
        Ok(())
    }
}
