//! Console rendering for evaluation runs.

use rageval_core::{EvaluationReport, TestResult};

const PASS_GLYPH: &str = "✓";
const FAIL_GLYPH: &str = "✗";

/// One status line per finished case.
pub fn case_line(result: &TestResult) -> String {
    let glyph = if result.passed { PASS_GLYPH } else { FAIL_GLYPH };
    format!(
        "  {glyph} {:<28} P={:.2} R={:.2} F1={:.2}",
        result.test_id, result.precision, result.recall, result.f1_score
    )
}

/// Overall summary printed after the last case.
pub fn summary_block(report: &EvaluationReport) -> String {
    let s = &report.summary;
    let mut lines = vec![
        String::new(),
        format!(
            "  Results: {}/{} passed ({:.1}%)",
            s.passed,
            s.total_tests,
            s.pass_rate * 100.0
        ),
        format!(
            "  Avg precision {:.2} | recall {:.2} | F1 {:.2} | {:.0} ms/query",
            s.avg_precision, s.avg_recall, s.avg_f1, s.avg_response_time_ms
        ),
    ];

    if !report.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("  Recommendations:".to_string());
        for rec in &report.recommendations {
            lines.push(format!("    - {rec}"));
        }
    }

    lines.join("\n")
}

/// Below-bar warning, or `None` when the run clears the required pass rate.
pub fn pass_rate_warning(report: &EvaluationReport, required_pass_rate: f64) -> Option<String> {
    if report.meets_pass_rate(required_pass_rate) {
        return None;
    }
    Some(format!(
        "WARNING: pass rate {:.1}% is below the required {:.1}%; retrieval quality has regressed",
        report.summary.pass_rate * 100.0,
        required_pass_rate * 100.0
    ))
}
