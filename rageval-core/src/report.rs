//! Report aggregation: summary statistics, category breakdown, and recommendations.
//!
//! Everything here is derived from the ordered result list alone. Empty inputs
//! resolve to zeros rather than NaN.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::runner::TestResult;
use crate::suite::TestSuite;

/// Bucket used for results whose case declares no category.
pub const DEFAULT_CATEGORY: &str = "general";

const PRECISION_ADVICE_BELOW: f64 = 0.7;
const RECALL_ADVICE_BELOW: f64 = 0.6;
const SLOW_FRACTION_ADVICE_ABOVE: f64 = 0.2;
const DISTRIBUTION_BUCKETS: usize = 5;

/// Headline numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub avg_precision: f64,
    pub avg_recall: f64,
    pub avg_f1: f64,
    pub avg_score: f64,
    pub avg_response_time_ms: f64,
}

/// Per-category aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub tests: usize,
    pub passed: usize,
    pub avg_precision: f64,
    pub avg_recall: f64,
}

/// Histogram of per-case average relevance scores over [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    /// Bucket label (`"0.0-0.2"`) to number of cases.
    pub buckets: Vec<ScoreBucket>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub range: String,
    pub count: usize,
}

/// Identifying metadata of the suite a report was produced from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteInfo {
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub evaluation_criteria: serde_json::Value,
}

/// The complete outcome of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub suite: SuiteInfo,
    pub summary: Summary,
    pub results: Vec<TestResult>,
    pub category_breakdown: BTreeMap<String, CategoryStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_distribution: Option<ScoreDistribution>,
    pub recommendations: Vec<String>,
}

impl EvaluationReport {
    /// Whether the run clears the given pass-rate bar.
    pub fn meets_pass_rate(&self, required: f64) -> bool {
        self.summary.pass_rate >= required
    }

    pub fn failed_results(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Reduces an ordered result list into an [`EvaluationReport`].
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    slow_response_ms: f64,
    include_score_distribution: bool,
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self {
            slow_response_ms: 2000.0,
            include_score_distribution: true,
        }
    }
}

impl ReportAggregator {
    pub fn new(slow_response_ms: f64, include_score_distribution: bool) -> Self {
        Self {
            slow_response_ms,
            include_score_distribution,
        }
    }

    /// Aggregator configured from a suite's run and reporting settings.
    pub fn for_suite(suite: &TestSuite) -> Self {
        Self::new(
            suite.test_config.slow_response_ms,
            suite.reporting.include_score_distribution,
        )
    }

    pub fn aggregate(&self, suite: SuiteInfo, results: Vec<TestResult>) -> EvaluationReport {
        let summary = summarize(&results);
        let category_breakdown = category_breakdown(&results);
        let recommendations = self.recommendations(&summary, &results);
        let score_distribution = self
            .include_score_distribution
            .then(|| score_distribution(&results));

        EvaluationReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            suite,
            summary,
            results,
            category_breakdown,
            score_distribution,
            recommendations,
        }
    }

    /// Threshold-driven improvement hints; every applicable one is included.
    pub fn recommendations(&self, summary: &Summary, results: &[TestResult]) -> Vec<String> {
        let mut recs = Vec::new();
        if results.is_empty() {
            return recs;
        }

        if summary.avg_precision < PRECISION_ADVICE_BELOW {
            recs.push(format!(
                "Average precision is {:.2}: review the chunking/segmentation strategy and the relevance scoring function to reduce irrelevant results",
                summary.avg_precision
            ));
        }
        if summary.avg_recall < RECALL_ADVICE_BELOW {
            recs.push(format!(
                "Average recall is {:.2}: expand knowledge-base source coverage and review embedding/similarity quality",
                summary.avg_recall
            ));
        }

        let slow = results
            .iter()
            .filter(|r| r.response_time_ms > self.slow_response_ms)
            .count();
        let slow_fraction = slow as f64 / results.len() as f64;
        if slow_fraction > SLOW_FRACTION_ADVICE_ABOVE {
            recs.push(format!(
                "{slow} of {} queries took longer than {:.0} ms: optimize indexing and retrieval performance",
                results.len(),
                self.slow_response_ms
            ));
        }

        let mismatched = results.iter().filter(|r| !r.category_match).count();
        if mismatched > 0 {
            recs.push(format!(
                "{mismatched} queries returned no chunk in the expected category: improve category classification at ingestion time"
            ));
        }
        recs
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Counts, pass rate, and metric means across all results.
pub fn summarize(results: &[TestResult]) -> Summary {
    let total_tests = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let pass_rate = if total_tests == 0 {
        0.0
    } else {
        passed as f64 / total_tests as f64
    };

    Summary {
        total_tests,
        passed,
        failed: total_tests - passed,
        pass_rate,
        avg_precision: mean(results.iter().map(|r| r.precision)),
        avg_recall: mean(results.iter().map(|r| r.recall)),
        avg_f1: mean(results.iter().map(|r| r.f1_score)),
        avg_score: mean(results.iter().map(|r| r.avg_score)),
        avg_response_time_ms: mean(results.iter().map(|r| r.response_time_ms)),
    }
}

/// Group results by declared category, defaulting to [`DEFAULT_CATEGORY`].
pub fn category_breakdown(results: &[TestResult]) -> BTreeMap<String, CategoryStats> {
    let mut groups: BTreeMap<String, Vec<&TestResult>> = BTreeMap::new();
    for result in results {
        let key = result
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        groups.entry(key).or_default().push(result);
    }

    groups
        .into_iter()
        .map(|(category, group)| {
            let stats = CategoryStats {
                tests: group.len(),
                passed: group.iter().filter(|r| r.passed).count(),
                avg_precision: mean(group.iter().map(|r| r.precision)),
                avg_recall: mean(group.iter().map(|r| r.recall)),
            };
            (category, stats)
        })
        .collect()
}

/// Bucket for a score; a score on an interior edge (0.6) opens the upper bucket.
fn bucket_index(score: f64) -> usize {
    let scaled = score.clamp(0.0, 1.0) * DISTRIBUTION_BUCKETS as f64;
    ((scaled + 1e-9).floor() as usize).min(DISTRIBUTION_BUCKETS - 1)
}

/// Five equal-width buckets over [0, 1]; 1.0 lands in the last bucket.
pub fn score_distribution(results: &[TestResult]) -> ScoreDistribution {
    let width = 1.0 / DISTRIBUTION_BUCKETS as f64;
    let mut counts = [0usize; DISTRIBUTION_BUCKETS];
    for result in results {
        counts[bucket_index(result.avg_score)] += 1;
    }

    let buckets = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| ScoreBucket {
            range: format!("{:.1}-{:.1}", i as f64 * width, (i + 1) as f64 * width),
            count,
        })
        .collect();

    let min = results
        .iter()
        .map(|r| r.avg_score)
        .fold(f64::INFINITY, f64::min);
    let max = results
        .iter()
        .map(|r| r.avg_score)
        .fold(f64::NEG_INFINITY, f64::max);

    ScoreDistribution {
        buckets,
        min: if results.is_empty() { 0.0 } else { min },
        max: if results.is_empty() { 0.0 } else { max },
    }
}
