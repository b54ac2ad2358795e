//! Suite orchestration and run lifecycle.
//!
//! ```text
//! Idle ──load──▶ Loaded ──run──▶ Running ──▶ Aggregated ──▶ Done
//!   │              │
//!   └──load error──┴──▶ Failed
//! ```
//!
//! Cases execute one at a time in declared order; each retrieval call is awaited
//! before the next starts so response times are attributable to a single call.

use std::fmt;
use std::path::Path;

use crate::error::{RagEvalError, Result};
use crate::report::{EvaluationReport, ReportAggregator, SuiteInfo};
use crate::retriever::Retriever;
use crate::runner::{CaseRunner, TestResult};
use crate::suite::TestSuite;

/// Lifecycle state of an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorState {
    Idle,
    Loaded,
    Running,
    Aggregated,
    Done,
    /// Suite loading failed; carries the reason.
    Failed(String),
}

impl EvaluatorState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Running => "running",
            Self::Aggregated => "aggregated",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for EvaluatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Drives a test suite through a retriever and produces the final report.
pub struct Evaluator {
    state: EvaluatorState,
    suite: Option<TestSuite>,
    results: Vec<TestResult>,
    report: Option<EvaluationReport>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            state: EvaluatorState::Idle,
            suite: None,
            results: Vec::new(),
            report: None,
        }
    }

    /// Start directly in `Loaded` with an in-memory suite.
    pub fn with_suite(suite: TestSuite) -> Self {
        Self {
            state: EvaluatorState::Loaded,
            suite: Some(suite),
            results: Vec::new(),
            report: None,
        }
    }

    pub fn state(&self) -> &EvaluatorState {
        &self.state
    }

    pub fn suite(&self) -> Option<&TestSuite> {
        self.suite.as_ref()
    }

    /// Results collected so far, in execution order.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn report(&self) -> Option<&EvaluationReport> {
        self.report.as_ref()
    }

    pub fn into_report(self) -> Option<EvaluationReport> {
        self.report
    }

    /// Load a suite definition from disk.
    ///
    /// Allowed from `Idle` or `Loaded` (replacing the previous suite). A load
    /// failure moves the evaluator to the terminal `Failed` state.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !matches!(self.state, EvaluatorState::Idle | EvaluatorState::Loaded) {
            return Err(self.invalid_state("idle or loaded"));
        }
        match TestSuite::load(path) {
            Ok(suite) => {
                tracing::info!(
                    path = %path.display(),
                    tests = suite.tests.len(),
                    "Test suite loaded"
                );
                self.suite = Some(suite);
                self.state = EvaluatorState::Loaded;
                Ok(())
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load test suite");
                self.suite = None;
                self.state = EvaluatorState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Run every case and aggregate the results.
    pub async fn run<R: Retriever + ?Sized>(&mut self, retriever: &R) -> Result<&EvaluationReport> {
        self.run_with_progress(retriever, |_| {}).await
    }

    /// Like [`run`](Self::run), invoking `on_result` after each case completes.
    pub async fn run_with_progress<R, F>(
        &mut self,
        retriever: &R,
        mut on_result: F,
    ) -> Result<&EvaluationReport>
    where
        R: Retriever + ?Sized,
        F: FnMut(&TestResult),
    {
        if self.state != EvaluatorState::Loaded {
            return Err(self.invalid_state("loaded"));
        }
        let suite = match self.suite.take() {
            Some(suite) => suite,
            None => return Err(self.invalid_state("loaded")),
        };

        self.state = EvaluatorState::Running;
        tracing::info!(
            retriever = retriever.name(),
            tests = suite.tests.len(),
            "Starting retrieval evaluation"
        );

        let runner = CaseRunner::new(&suite.test_config);
        for (idx, case) in suite.tests.iter().enumerate() {
            tracing::debug!(index = idx + 1, test_id = %case.id, "Running test case");
            let result = runner.run(case, retriever).await;
            tracing::info!(
                test_id = %result.test_id,
                passed = result.passed,
                precision = result.precision,
                recall = result.recall,
                response_time_ms = result.response_time_ms,
                "Test case finished"
            );
            on_result(&result);
            self.results.push(result);
        }

        let info = SuiteInfo {
            description: suite.description.clone(),
            version: suite.version.clone(),
            evaluation_criteria: suite.evaluation_criteria.clone(),
        };
        let report = ReportAggregator::for_suite(&suite).aggregate(info, self.results.clone());
        self.state = EvaluatorState::Aggregated;
        tracing::info!(
            total = report.summary.total_tests,
            passed = report.summary.passed,
            pass_rate = report.summary.pass_rate,
            "Evaluation aggregated"
        );

        self.suite = Some(suite);
        self.state = EvaluatorState::Done;
        Ok(&*self.report.insert(report))
    }

    fn invalid_state(&self, expected: &'static str) -> RagEvalError {
        RagEvalError::InvalidState {
            state: self.state.name(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::{RetrievedChunk, StaticRetriever};
    use crate::suite::RetrievalTestCase;

    fn case(id: &str, query: &str, expected: &str) -> RetrievalTestCase {
        RetrievalTestCase {
            id: id.to_string(),
            query: query.to_string(),
            expected_docs: vec![expected.to_string()],
            expected_sections: vec![],
            expected_keywords: vec![],
            min_score: 0.5,
            category: None,
            description: String::new(),
            expect_low_confidence: false,
        }
    }

    #[test]
    fn test_initial_state() {
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.state(), &EvaluatorState::Idle);
        assert!(evaluator.report().is_none());
    }

    #[test]
    fn test_load_failure_moves_to_failed() {
        let mut evaluator = Evaluator::new();
        let err = evaluator
            .load(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, RagEvalError::Load(_)));
        assert!(matches!(evaluator.state(), EvaluatorState::Failed(_)));
        // Failed is terminal.
        assert!(evaluator.load(Path::new("/definitely/not/here.yaml")).is_err());
        assert_eq!(evaluator.state().name(), "failed");
    }

    #[tokio::test]
    async fn test_run_requires_loaded_suite() {
        let mut evaluator = Evaluator::new();
        let err = evaluator.run(&StaticRetriever::new()).await.unwrap_err();
        assert!(matches!(
            err,
            RagEvalError::InvalidState {
                state: "idle",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_run_reaches_done_in_order() {
        let mut suite = TestSuite::new("order");
        suite.tests = vec![
            case("third", "q3", "c.md"),
            case("first", "q1", "a.md"),
            case("second", "q2", "b.md"),
        ];
        let retriever = StaticRetriever::new()
            .with_response("q1", vec![RetrievedChunk::new("a.md", "", 0.9)])
            .with_response("q2", vec![RetrievedChunk::new("b.md", "", 0.9)]);

        let mut seen = Vec::new();
        let mut evaluator = Evaluator::with_suite(suite);
        let report = evaluator
            .run_with_progress(&retriever, |r| seen.push(r.test_id.clone()))
            .await
            .unwrap();

        let ids: Vec<&str> = report.results.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["third", "first", "second"]);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(seen, vec!["third", "first", "second"]);
        assert_eq!(evaluator.state(), &EvaluatorState::Done);
        assert_eq!(retriever.calls(), 3);
    }

    #[tokio::test]
    async fn test_done_cannot_rerun() {
        let mut evaluator = Evaluator::with_suite(TestSuite::new("empty"));
        evaluator.run(&StaticRetriever::new()).await.unwrap();
        assert!(evaluator.run(&StaticRetriever::new()).await.is_err());
        assert!(evaluator.into_report().is_some());
    }
}
