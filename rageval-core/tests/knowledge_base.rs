//! SQLite knowledge-base retriever against a fixture store.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use rageval_core::{
    Evaluator, RetrievalError, RetrievalRequest, Retriever, SqliteKnowledgeBase, TestSuite,
};

/// Build a small fixture store the way an ingestion pipeline would leave it.
fn fixture_store(dir: &Path) -> PathBuf {
    let path = dir.join("knowledge.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE chunks (path TEXT NOT NULL, content TEXT NOT NULL, category TEXT);
         CREATE VIRTUAL TABLE chunks_fts USING fts5(content, content='chunks', content_rowid='rowid');",
    )
    .unwrap();
    let rows = [
        (
            "kb/account/login-guide.md",
            "To log in, enter your username and password on the sign in page.",
            Some("account"),
        ),
        (
            "kb/account/password-reset.md",
            "Forgot your password? Use the reset link to choose a new password.",
            Some("account"),
        ),
        (
            "kb/billing/refunds.md",
            "Refunds are available within 30 days of purchase with a receipt.",
            Some("billing"),
        ),
        (
            "kb/billing/invoices.md",
            "Download any invoice from the billing page of your dashboard.",
            Some("billing"),
        ),
        (
            "kb/misc/changelog.md",
            "Release notes and version history for the product.",
            None,
        ),
    ];
    for (p, content, category) in rows {
        conn.execute(
            "INSERT INTO chunks (path, content, category) VALUES (?1, ?2, ?3)",
            rusqlite::params![p, content, category],
        )
        .unwrap();
    }
    conn.execute("INSERT INTO chunks_fts(chunks_fts) VALUES('rebuild')", [])
        .unwrap();
    path
}

fn request(query: &str, limit: usize, category: Option<&str>) -> RetrievalRequest {
    RetrievalRequest {
        query: query.to_string(),
        limit,
        category: category.map(String::from),
        min_score: Some(0.0),
    }
}

fn open_fixture() -> (TempDir, SqliteKnowledgeBase) {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture_store(dir.path());
    let kb = SqliteKnowledgeBase::open(&path).unwrap();
    (dir, kb)
}

#[tokio::test]
async fn ranks_matching_chunks_by_relevance() {
    let (_dir, kb) = open_fixture();
    let chunks = kb
        .retrieve(&request("reset forgotten password", 5, None))
        .await
        .unwrap();

    assert!(!chunks.is_empty());
    assert_eq!(chunks[0].path, "kb/account/password-reset.md");
    assert_eq!(chunks[0].category.as_deref(), Some("account"));
    for pair in chunks.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for chunk in &chunks {
        assert!((0.0..1.0).contains(&chunk.score));
    }
}

#[tokio::test]
async fn respects_limit_and_category() {
    let (_dir, kb) = open_fixture();
    let chunks = kb
        .retrieve(&request("password billing page", 1, None))
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);

    let billing = kb
        .retrieve(&request("password billing page", 5, Some("billing")))
        .await
        .unwrap();
    assert!(!billing.is_empty());
    assert!(billing.iter().all(|c| c.category.as_deref() == Some("billing")));
}

#[tokio::test]
async fn min_score_filters_weak_matches() {
    let (_dir, kb) = open_fixture();
    let mut req = request("password", 5, None);
    req.min_score = Some(0.999_999);
    assert!(kb.retrieve(&req).await.unwrap().is_empty());
}

#[tokio::test]
async fn query_without_terms_returns_nothing() {
    let (_dir, kb) = open_fixture();
    assert!(kb.retrieve(&request("?!", 5, None)).await.unwrap().is_empty());
}

#[tokio::test]
async fn closed_store_reports_unavailable() {
    let (_dir, kb) = open_fixture();
    assert!(kb.is_open());
    kb.close().unwrap();
    assert!(!kb.is_open());
    // Closing twice is harmless.
    kb.close().unwrap();

    let err = kb
        .retrieve(&request("password", 5, None))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Unavailable { .. }));
}

#[tokio::test]
async fn evaluates_suite_against_store() {
    let (_dir, kb) = open_fixture();
    let suite = TestSuite::from_yaml_str(
        r#"
test_config:
  max_results_to_evaluate: 1
tests:
  - id: refunds
    query: refunds within 30 days
    expected_docs: [refunds.md]
    expected_keywords: [receipt]
    category: billing
  - id: login
    query: log in with username
    expected_docs: [login-guide.md]
    category: account
"#,
    )
    .unwrap();

    let mut evaluator = Evaluator::with_suite(suite);
    let report = evaluator.run(&kb).await.unwrap();
    kb.close().unwrap();

    assert_eq!(report.summary.total_tests, 2);
    assert_eq!(report.results[0].retrieved_docs, vec!["refunds.md"]);
    assert_eq!(report.results[0].keywords_found, vec!["receipt"]);
    assert_eq!(report.results[1].retrieved_docs, vec!["login-guide.md"]);
    assert_eq!(report.summary.avg_precision, 1.0);
    assert_eq!(report.summary.avg_recall, 1.0);
}
