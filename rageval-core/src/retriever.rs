//! Retrieval collaborator contract.
//!
//! The engine never searches on its own; it drives any [`Retriever`] and scores
//! what comes back. [`StaticRetriever`] serves canned responses for dry runs and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RetrievalError;

/// One retrieval call as issued by the case runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    pub limit: usize,
    pub category: Option<String>,
    pub min_score: Option<f64>,
}

/// A retrieved unit of content with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Source path or identifier of the document the chunk came from.
    pub path: String,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub category: Option<String>,
}

impl RetrievedChunk {
    pub fn new(path: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            score,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A retrieval backend under evaluation.
///
/// Implementations return chunks sorted by descending score, at most
/// `request.limit` of them, and must be safe to call repeatedly. Failures are
/// reported as errors, never as sentinel results.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError>;

    /// Human-readable backend name for logs and reports.
    fn name(&self) -> &str {
        "retriever"
    }
}

/// Retriever with fixed per-query responses.
///
/// Unknown queries return no results. Responses are truncated to the request limit.
#[derive(Default)]
pub struct StaticRetriever {
    responses: HashMap<String, Result<Vec<RetrievedChunk>, RetrievalError>>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the chunks returned for `query`.
    pub fn with_response(mut self, query: &str, chunks: Vec<RetrievedChunk>) -> Self {
        self.responses.insert(query.to_string(), Ok(chunks));
        self
    }

    /// Make `query` fail with a backend error.
    pub fn with_failure(mut self, query: &str, message: &str) -> Self {
        self.responses
            .insert(query.to_string(), Err(RetrievalError::backend(message)));
        self
    }

    /// Number of retrieval calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(&request.query) {
            Some(Ok(chunks)) => Ok(chunks.iter().take(request.limit).cloned().collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
