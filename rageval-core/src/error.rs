//! Error types for the rageval core library.
//!
//! Uses `thiserror` for public API error types with structured variants covering
//! suite loading, retrieval, report persistence, and configuration.

use std::path::PathBuf;

/// Top-level error type for the rageval core library.
#[derive(Debug, thiserror::Error)]
pub enum RagEvalError {
    #[error("Suite load error: {0}")]
    Load(#[from] LoadError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(#[from] KnowledgeBaseError),

    #[error("Evaluator is in state {state}, expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },
}

/// Errors raised while reading or validating a test suite definition.
///
/// All of these are fatal: no test case runs once one is raised.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Suite definition not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read suite definition {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed suite definition {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid suite definition: {reason}")]
    Invalid { reason: String },
}

/// Failures raised by a retrieval backend for a single query.
///
/// These are recoverable at case granularity: the runner records them on the
/// case's result and the suite continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetrievalError {
    #[error("backend error: {message}")]
    Backend { message: String },

    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("retriever unavailable: {message}")]
    Unavailable { message: String },
}

impl RetrievalError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable {
            message: msg.into(),
        }
    }
}

/// Errors from writing report artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the layered application configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("Config file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
}

/// Errors from opening or closing the knowledge-base store.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeBaseError {
    #[error("Knowledge base not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Knowledge base {} is missing table '{table}'", path.display())]
    MissingTable { path: PathBuf, table: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Convenience result alias for rageval operations.
pub type Result<T> = std::result::Result<T, RagEvalError>;
