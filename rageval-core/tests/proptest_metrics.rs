//! Property-based tests for the retrieval metrics using proptest.

use proptest::prelude::*;

use rageval_core::metrics::{precision_with, recall_with};
use rageval_core::{DocumentMatch, RetrievedChunk, f1, keyword_coverage, precision, recall};

fn doc_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}(/[a-z]{1,8})?\\.md", 0..8)
}

fn any_mode() -> impl Strategy<Value = DocumentMatch> {
    prop_oneof![Just(DocumentMatch::Substring), Just(DocumentMatch::Exact)]
}

// --- Precision / recall bounds ---

proptest! {
    #[test]
    fn precision_and_recall_stay_in_unit_interval(
        expected in doc_ids(),
        retrieved in doc_ids(),
        mode in any_mode(),
    ) {
        let p = precision_with(mode, &expected, &retrieved);
        let r = recall_with(mode, &expected, &retrieved);
        prop_assert!((0.0..=1.0).contains(&p));
        prop_assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn recall_is_one_when_nothing_expected(retrieved in doc_ids(), mode in any_mode()) {
        let expected: Vec<String> = Vec::new();
        prop_assert_eq!(recall_with(mode, &expected, &retrieved), 1.0);
    }

    #[test]
    fn precision_is_zero_when_nothing_retrieved(expected in doc_ids(), mode in any_mode()) {
        let retrieved: Vec<String> = Vec::new();
        prop_assert_eq!(precision_with(mode, &expected, &retrieved), 0.0);
    }

    #[test]
    fn retrieving_exactly_the_expected_set_is_perfect(expected in doc_ids()) {
        prop_assume!(!expected.is_empty());
        prop_assert_eq!(precision(&expected, &expected), 1.0);
        prop_assert_eq!(recall(&expected, &expected), 1.0);
    }
}

// --- F1 properties ---

proptest! {
    #[test]
    fn f1_matches_harmonic_mean(p in 0.0f64..=1.0, r in 0.0f64..=1.0) {
        let score = f1(p, r);
        if p + r == 0.0 {
            prop_assert_eq!(score, 0.0);
        } else {
            let expected = 2.0 * p * r / (p + r);
            prop_assert!((score - expected).abs() < 1e-12);
        }
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert!(score <= p.max(r) + 1e-12);
    }

    #[test]
    fn f1_is_symmetric(p in 0.0f64..=1.0, r in 0.0f64..=1.0) {
        prop_assert!((f1(p, r) - f1(r, p)).abs() < 1e-12);
    }
}

// --- Keyword coverage ---

proptest! {
    #[test]
    fn keyword_coverage_partitions_input(
        keywords in prop::collection::vec("[a-zA-Z]{1,6}", 0..6),
        content in "[a-zA-Z ]{0,40}",
    ) {
        let chunks = vec![RetrievedChunk::new("doc.md", content, 0.5)];
        let coverage = keyword_coverage(&keywords, &chunks);
        prop_assert_eq!(coverage.found.len() + coverage.missing.len(), keywords.len());
        for kw in &coverage.found {
            prop_assert!(chunks[0].content.to_lowercase().contains(&kw.to_lowercase()));
        }
    }
}
