//! SQLite knowledge-base retriever.
//!
//! Reads an existing store; nothing here writes to it. Expected schema:
//!
//! ```sql
//! CREATE TABLE chunks (path TEXT NOT NULL, content TEXT NOT NULL, category TEXT);
//! CREATE VIRTUAL TABLE chunks_fts USING fts5(content, content='chunks', content_rowid='rowid');
//! ```
//!
//! The handle is acquired once before a run and released with [`SqliteKnowledgeBase::close`]
//! afterwards. Dropping it releases the connection as well, so early returns and
//! panics never leak it.

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, params_from_iter, types::Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{KnowledgeBaseError, RetrievalError};
use crate::retriever::{RetrievalRequest, RetrievedChunk, Retriever};

const CHUNKS_TABLE: &str = "chunks";
const FTS_TABLE: &str = "chunks_fts";

/// Read-only full-text retriever over a SQLite knowledge base.
pub struct SqliteKnowledgeBase {
    path: PathBuf,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteKnowledgeBase {
    /// Open the store read-only and verify the expected tables exist.
    pub fn open(path: &Path) -> Result<Self, KnowledgeBaseError> {
        if !path.exists() {
            return Err(KnowledgeBaseError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        for table in [CHUNKS_TABLE, FTS_TABLE] {
            let found: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
                [table],
                |row| row.get(0),
            )?;
            if found == 0 {
                return Err(KnowledgeBaseError::MissingTable {
                    path: path.to_path_buf(),
                    table: table.to_string(),
                });
            }
        }
        tracing::info!(path = %path.display(), "Opened knowledge base");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the connection. Later retrievals fail with `Unavailable`.
    pub fn close(&self) -> Result<(), KnowledgeBaseError> {
        let taken = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(conn) = taken {
            conn.close().map_err(|(_, e)| KnowledgeBaseError::Sqlite(e))?;
            tracing::info!(path = %self.path.display(), "Closed knowledge base");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

/// Turn free text into an FTS5 query: quoted terms joined with OR.
///
/// Returns `None` when the text has no searchable terms.
pub fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Map an FTS5 bm25 rank (lower is better) to a score in [0, 1) that grows with relevance.
pub fn normalize_bm25(rank: f64) -> f64 {
    let magnitude = rank.abs();
    magnitude / (1.0 + magnitude)
}

fn search(
    conn: &Connection,
    request: &RetrievalRequest,
) -> Result<Vec<RetrievedChunk>, rusqlite::Error> {
    let Some(match_expr) = fts_query(&request.query) else {
        return Ok(Vec::new());
    };

    let mut sql = format!(
        "SELECT c.path, c.content, c.category, bm25({FTS_TABLE}) AS bm25_rank \
         FROM {FTS_TABLE} JOIN {CHUNKS_TABLE} c ON c.rowid = {FTS_TABLE}.rowid \
         WHERE {FTS_TABLE} MATCH ?1"
    );
    let mut params: Vec<Value> = vec![Value::Text(match_expr)];
    if let Some(category) = &request.category {
        sql.push_str(" AND c.category = ?2");
        params.push(Value::Text(category.clone()));
    }
    sql.push_str(&format!(" ORDER BY bm25_rank LIMIT ?{}", params.len() + 1));
    params.push(Value::Integer(request.limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        let rank: f64 = row.get(3)?;
        Ok(RetrievedChunk {
            path: row.get(0)?,
            content: row.get(1)?,
            category: row.get(2)?,
            score: normalize_bm25(rank),
        })
    })?;

    let min_score = request.min_score.unwrap_or(0.0);
    let mut chunks = Vec::new();
    for row in rows {
        let chunk = row?;
        if chunk.score >= min_score {
            chunks.push(chunk);
        }
    }
    Ok(chunks)
}

#[async_trait]
impl Retriever for SqliteKnowledgeBase {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let conn = Arc::clone(&self.conn);
        let request = request.clone();

        // Run blocking SQLite work on a blocking thread
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RetrievalError::unavailable("knowledge base lock poisoned"))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| RetrievalError::unavailable("knowledge base is closed"))?;
            search(conn, &request).map_err(|e| RetrievalError::backend(format!("SQLite query failed: {e}")))
        })
        .await
        .map_err(|e| RetrievalError::backend(format!("SQLite task join error: {e}")))?
    }

    fn name(&self) -> &str {
        "sqlite-fts"
    }
}
