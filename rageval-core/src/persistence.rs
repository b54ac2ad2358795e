//! Report artifacts on disk.
//!
//! `json` writes the full report, `summary` a condensed plain-text digest shaped by
//! the suite's reporting preferences.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::ReportError;
use crate::report::EvaluationReport;
use crate::suite::ReportingConfig;

pub const JSON_REPORT_FILE: &str = "retrieval_report.json";
pub const SUMMARY_REPORT_FILE: &str = "retrieval_summary.txt";

/// Writes report artifacts into a fixed output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every requested format and return the paths written.
    pub fn write(
        &self,
        report: &EvaluationReport,
        reporting: &ReportingConfig,
    ) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::Write {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut written = Vec::new();
        for format in &reporting.formats {
            match format.to_lowercase().as_str() {
                "json" => {
                    let json = serde_json::to_string_pretty(report)?;
                    written.push(self.write_file(JSON_REPORT_FILE, &json)?);
                }
                "summary" | "text" | "txt" => {
                    let summary = render_summary(report, reporting);
                    written.push(self.write_file(SUMMARY_REPORT_FILE, &summary)?);
                }
                other => {
                    tracing::warn!(format = other, "Unsupported report format, skipping");
                }
            }
        }
        Ok(written)
    }

    fn write_file(&self, name: &str, content: &str) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(name);
        std::fs::write(&path, content).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote report artifact");
        Ok(path)
    }
}

/// Render the condensed human-readable summary.
pub fn render_summary(report: &EvaluationReport, reporting: &ReportingConfig) -> String {
    let s = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "Retrieval Evaluation Summary");
    let _ = writeln!(out, "============================");
    if !report.suite.description.is_empty() {
        let _ = writeln!(out, "Suite: {} (v{})", report.suite.description, report.suite.version);
    }
    let _ = writeln!(out, "Run: {} at {}", report.run_id, report.generated_at.to_rfc3339());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Tests: {}  Passed: {}  Failed: {}  Pass rate: {:.1}%",
        s.total_tests,
        s.passed,
        s.failed,
        s.pass_rate * 100.0
    );
    let _ = writeln!(
        out,
        "Avg precision: {:.3}  Avg recall: {:.3}  Avg F1: {:.3}",
        s.avg_precision, s.avg_recall, s.avg_f1
    );
    let _ = writeln!(
        out,
        "Avg relevance score: {:.3}  Avg response time: {:.1} ms",
        s.avg_score, s.avg_response_time_ms
    );

    if reporting.include_category_breakdown && !report.category_breakdown.is_empty() {
        let _ = writeln!(out, "\nBy category:");
        for (category, stats) in &report.category_breakdown {
            let _ = writeln!(
                out,
                "  {category:<20} {}/{} passed  P={:.2} R={:.2}",
                stats.passed, stats.tests, stats.avg_precision, stats.avg_recall
            );
        }
    }

    if reporting.include_score_distribution {
        if let Some(dist) = &report.score_distribution {
            let _ = writeln!(out, "\nScore distribution (min {:.2}, max {:.2}):", dist.min, dist.max);
            for bucket in &dist.buckets {
                let _ = writeln!(out, "  {:<8} {:>4}  {}", bucket.range, bucket.count, "#".repeat(bucket.count));
            }
        }
    }

    if reporting.include_failed_queries {
        let failed: Vec<_> = report.failed_results().collect();
        if !failed.is_empty() {
            let _ = writeln!(out, "\nFailed queries:");
            for result in failed {
                let _ = writeln!(out, "  [{}] {}", result.test_id, result.query);
                let _ = writeln!(out, "    expected:  {}", result.expected_docs.join(", "));
                let _ = writeln!(out, "    retrieved: {}", result.retrieved_docs.join(", "));
                for error in &result.errors {
                    let _ = writeln!(out, "    - {error}");
                }
                if !result.keywords_missing.is_empty() {
                    let _ = writeln!(out, "    missing keywords: {}", result.keywords_missing.join(", "));
                }
            }
        }
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations:");
        for rec in &report.recommendations {
            let _ = writeln!(out, "  * {rec}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportAggregator, SuiteInfo};
    use crate::runner::TestResult;

    fn sample_report() -> EvaluationReport {
        let failing = TestResult {
            test_id: "refund".into(),
            query: "refund window".into(),
            category: Some("billing".into()),
            expect_low_confidence: false,
            expected_docs: vec!["refunds.md".into()],
            retrieved_docs: vec!["faq.md".into()],
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            avg_score: 0.4,
            min_score_met: false,
            category_match: true,
            keywords_found: vec![],
            keywords_missing: vec!["30 days".into()],
            response_time_ms: 12.0,
            passed: false,
            errors: vec!["Low precision: 0.00".into()],
        };
        let passing = TestResult {
            test_id: "login".into(),
            passed: true,
            precision: 1.0,
            recall: 1.0,
            f1_score: 1.0,
            errors: vec![],
            category: None,
            ..failing.clone()
        };
        let info = SuiteInfo {
            description: "Support KB".into(),
            version: "1.2".into(),
            evaluation_criteria: serde_json::Value::Null,
        };
        ReportAggregator::default().aggregate(info, vec![passing, failing])
    }

    #[test]
    fn test_render_summary_sections() {
        let report = sample_report();
        let text = render_summary(&report, &ReportingConfig::default());
        assert!(text.contains("Suite: Support KB (v1.2)"));
        assert!(text.contains("Pass rate: 50.0%"));
        assert!(text.contains("By category:"));
        assert!(text.contains("billing"));
        assert!(text.contains("Score distribution"));
        assert!(text.contains("Failed queries:"));
        assert!(text.contains("[refund] refund window"));
        assert!(text.contains("missing keywords: 30 days"));
        assert!(text.contains("Recommendations:"));
    }

    #[test]
    fn test_render_summary_respects_preferences() {
        let report = sample_report();
        let reporting = ReportingConfig {
            formats: vec!["summary".into()],
            include_failed_queries: false,
            include_score_distribution: false,
            include_category_breakdown: false,
        };
        let text = render_summary(&report, &reporting);
        assert!(!text.contains("By category:"));
        assert!(!text.contains("Failed queries:"));
        assert!(!text.contains("Score distribution"));
    }

    #[test]
    fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("results");
        let writer = ReportWriter::new(&out);
        let reporting = ReportingConfig {
            formats: vec!["json".into(), "summary".into(), "pdf".into()],
            ..ReportingConfig::default()
        };

        let written = writer.write(&sample_report(), &reporting).unwrap();
        assert_eq!(written.len(), 2);
        assert!(out.join(JSON_REPORT_FILE).exists());
        assert!(out.join(SUMMARY_REPORT_FILE).exists());

        let json = std::fs::read_to_string(out.join(JSON_REPORT_FILE)).unwrap();
        let parsed: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.total_tests, 2);
        assert_eq!(parsed.results[0].test_id, "login");
    }
}
