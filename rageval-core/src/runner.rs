//! Single-case execution: one retrieval call, timed, scored, and judged.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::RetrievalError;
use crate::metrics::{self, KeywordCoverage};
use crate::retriever::{RetrievalRequest, RetrievedChunk, Retriever};
use crate::suite::{DocumentMatch, RetrievalTestCase, TestConfig};

/// Outcome of one test case. Never mutated after the runner returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: String,
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub expect_low_confidence: bool,
    pub expected_docs: Vec<String>,
    /// Normalized document names in retrieval order.
    pub retrieved_docs: Vec<String>,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub avg_score: f64,
    pub min_score_met: bool,
    pub category_match: bool,
    pub keywords_found: Vec<String>,
    pub keywords_missing: Vec<String>,
    pub response_time_ms: f64,
    pub passed: bool,
    pub errors: Vec<String>,
}

/// Runs individual test cases against a retriever using the suite's configuration.
pub struct CaseRunner<'a> {
    config: &'a TestConfig,
}

impl<'a> CaseRunner<'a> {
    pub fn new(config: &'a TestConfig) -> Self {
        Self { config }
    }

    /// Build the retrieval request for a case.
    pub fn request_for(&self, case: &RetrievalTestCase) -> RetrievalRequest {
        RetrievalRequest {
            query: case.query.clone(),
            limit: self.config.max_results_to_evaluate,
            category: case.category.clone(),
            min_score: Some(self.config.vector_similarity_threshold),
        }
    }

    /// Execute exactly one retrieval call for `case` and score the outcome.
    ///
    /// Retrieval failures and timeouts are folded into a failed result; this never errors.
    pub async fn run<R: Retriever + ?Sized>(
        &self,
        case: &RetrievalTestCase,
        retriever: &R,
    ) -> TestResult {
        let request = self.request_for(case);
        let started = Instant::now();
        let outcome = self.retrieve_with_timeout(retriever, &request).await;
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(chunks) => self.score(case, &chunks, response_time_ms),
            Err(e) => {
                tracing::warn!(test_id = %case.id, error = %e, "Retrieval failed");
                Self::failed(case, &e, response_time_ms)
            }
        }
    }

    async fn retrieve_with_timeout<R: Retriever + ?Sized>(
        &self,
        retriever: &R,
        request: &RetrievalRequest,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        if self.config.timeout_seconds == 0 {
            return retriever.retrieve(request).await;
        }
        let limit = Duration::from_secs(self.config.timeout_seconds);
        match tokio::time::timeout(limit, retriever.retrieve(request)).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout {
                timeout_secs: self.config.timeout_seconds,
            }),
        }
    }

    fn score(
        &self,
        case: &RetrievalTestCase,
        chunks: &[RetrievedChunk],
        response_time_ms: f64,
    ) -> TestResult {
        let retrieved_docs: Vec<String> = chunks
            .iter()
            .map(|c| metrics::document_name(&c.path))
            .collect();

        let mode = self.config.document_match;
        // Exact mode needs the directory part, so it matches on the full source paths.
        let match_ids: Vec<&str> = match mode {
            DocumentMatch::Substring => retrieved_docs.iter().map(String::as_str).collect(),
            DocumentMatch::Exact => chunks.iter().map(|c| c.path.as_str()).collect(),
        };
        let precision = metrics::precision_with(mode, &case.expected_docs, &match_ids);
        let recall = metrics::recall_with(mode, &case.expected_docs, &match_ids);
        let f1_score = metrics::f1(precision, recall);

        let avg_score = if chunks.is_empty() {
            0.0
        } else {
            chunks.iter().map(|c| c.score).sum::<f64>() / chunks.len() as f64
        };
        let min_score_met = avg_score >= case.min_score;

        let category_match = match &case.category {
            None => true,
            Some(expected) => chunks
                .iter()
                .any(|c| c.category.as_deref() == Some(expected.as_str())),
        };

        let coverage = if case.expected_keywords.is_empty() {
            KeywordCoverage::default()
        } else {
            metrics::keyword_coverage(&case.expected_keywords, chunks)
        };

        let mut errors = Vec::new();
        if precision < self.config.min_precision {
            errors.push(format!("Low precision: {precision:.2}"));
        }
        if recall < self.config.min_recall {
            errors.push(format!("Low recall: {recall:.2}"));
        }
        if !min_score_met {
            errors.push(format!("Min score not met: {avg_score:.2}"));
        }
        if !category_match {
            if let Some(expected) = &case.category {
                errors.push(format!("Category mismatch: expected {expected}"));
            }
        }
        let passed = errors.is_empty();

        tracing::debug!(
            test_id = %case.id,
            retrieved = retrieved_docs.len(),
            precision,
            recall,
            avg_score,
            passed,
            "Scored test case"
        );

        TestResult {
            test_id: case.id.clone(),
            query: case.query.clone(),
            category: case.category.clone(),
            expect_low_confidence: case.expect_low_confidence,
            expected_docs: case.expected_docs.clone(),
            retrieved_docs,
            precision,
            recall,
            f1_score,
            avg_score,
            min_score_met,
            category_match,
            keywords_found: coverage.found,
            keywords_missing: coverage.missing,
            response_time_ms,
            passed,
            errors,
        }
    }

    fn failed(case: &RetrievalTestCase, error: &RetrievalError, response_time_ms: f64) -> TestResult {
        let message = match error {
            RetrievalError::Timeout { timeout_secs } => {
                format!("Retrieval timed out after {timeout_secs}s")
            }
            other => format!("Retrieval failed: {other}"),
        };
        let coverage = KeywordCoverage::all_missing(&case.expected_keywords);
        TestResult {
            test_id: case.id.clone(),
            query: case.query.clone(),
            category: case.category.clone(),
            expect_low_confidence: case.expect_low_confidence,
            expected_docs: case.expected_docs.clone(),
            retrieved_docs: Vec::new(),
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            avg_score: 0.0,
            min_score_met: false,
            category_match: false,
            keywords_found: coverage.found,
            keywords_missing: coverage.missing,
            response_time_ms,
            passed: false,
            errors: vec![message],
        }
    }
}
