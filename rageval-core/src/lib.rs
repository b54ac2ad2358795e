//! # rageval-core: Retrieval-Quality Evaluation Engine
//!
//! Scores a retrieval backend against a curated suite of gold-standard expectations
//! and reports actionable deltas.
//!
//! Data flows one way:
//!
//! ```text
//! TestSuite → Evaluator → (CaseRunner × N, using metrics) → Vec<TestResult>
//!           → ReportAggregator → EvaluationReport
//! ```
//!
//! The engine never indexes or embeds content; it drives any [`Retriever`]
//! implementation and judges what comes back.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod knowledge_base;
pub mod metrics;
pub mod persistence;
pub mod report;
pub mod retriever;
pub mod runner;
pub mod suite;

// Re-exports
pub use config::{ConfigOverrides, EvalConfig, load_config};
pub use error::{
    ConfigError, KnowledgeBaseError, LoadError, RagEvalError, ReportError, RetrievalError,
};
pub use evaluator::{Evaluator, EvaluatorState};
pub use knowledge_base::SqliteKnowledgeBase;
pub use metrics::{KeywordCoverage, f1, keyword_coverage, precision, recall};
pub use persistence::ReportWriter;
pub use report::{CategoryStats, EvaluationReport, ReportAggregator, Summary};
pub use retriever::{RetrievalRequest, RetrievedChunk, Retriever, StaticRetriever};
pub use runner::{CaseRunner, TestResult};
pub use suite::{DocumentMatch, ReportingConfig, RetrievalTestCase, TestConfig, TestSuite};
