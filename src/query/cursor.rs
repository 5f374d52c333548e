//! Forward-only paged cursor.
//!
//! The first page is fetched when the query is opened; later pages are fetched lazily,
//! only once the caller asks for the row after the last one of the current page.

use log::debug;

use super::connection::CatalogConnection;
use super::executor::{Executor, PageOutcome, QueryExecutor};
use crate::errors::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// The current row has not been handed out yet.
    Fresh,
    Iterating,
    End,
    LimitReached,
}

/// Opened query. Yields rows as ordered field lists; iteration ends after the last
/// row, after the row limit, or after the first error.
pub struct Query<'c, C: CatalogConnection> {
    executor: Executor<'c, C>,
    query_string: String,
    limit: u64,
    rows_processed: u64,
    row_idx: usize,
    state: CursorState,
}

impl<'c, C: CatalogConnection> Query<'c, C> {
    /// Fetch the first page. A "no rows" answer gives an already-ended query.
    pub(crate) fn start(mut executor: Executor<'c, C>, query_string: String, limit: u64) -> Result<Self, QueryError> {
        let state = match executor.fetch_page() {
            Ok(PageOutcome::Rows) if executor.results_valid() => CursorState::Fresh,
            Ok(_) => CursorState::End,
            Err(code) => {
                return Err(QueryError::BackendExecution {
                    code,
                    message: format!("failed to execute query [{}]", query_string),
                });
            }
        };
        debug!("opened query [{}], first page holds {} rows", query_string, executor.row_count());
        Ok(Self { executor, query_string, limit, rows_processed: 0, row_idx: 0, state })
    }

    fn ended(&self) -> bool { matches!(self.state, CursorState::End | CursorState::LimitReached) }

    fn advance(&mut self) -> Result<(), QueryError> {
        self.rows_processed += 1;
        if self.query_limit_exceeded(self.rows_processed) {
            debug!("row limit {} reached", self.limit);
            self.state = CursorState::LimitReached;
            return Ok(());
        }

        self.row_idx += 1;
        if self.row_idx < self.executor.row_count() {
            return Ok(());
        }

        if self.executor.query_complete() {
            self.state = CursorState::End;
            return Ok(());
        }

        self.executor.reset_for_page_boundary();
        match self.executor.fetch_page() {
            Ok(PageOutcome::NoRows) => self.state = CursorState::End,
            Ok(PageOutcome::Rows) => {
                self.row_idx = 0;
                if !self.executor.results_valid() {
                    self.state = CursorState::End;
                }
            }
            Err(code) => {
                self.state = CursorState::End;
                return Err(QueryError::BackendExecution {
                    code,
                    message: format!(
                        "failed to fetch page for query [{}] with continuation index [{}]",
                        self.query_string,
                        self.executor.cont_idx()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Rows in the current page. No total is ever computed.
    pub fn size(&self) -> usize { if self.ended() { 0 } else { self.executor.row_count() } }

    pub fn row_count(&self) -> usize { self.size() }

    /// First row of the current page.
    pub fn front(&self) -> Option<Vec<String>> {
        if self.ended() || self.executor.row_count() == 0 {
            return None;
        }
        Some(self.executor.capture_results(0))
    }

    /// No further page exists.
    pub fn query_complete(&self) -> bool { self.executor.query_complete() }

    pub fn query_limit_exceeded(&self, n: u64) -> bool { self.limit > 0 && n >= self.limit }

    pub fn query_string(&self) -> &str { &self.query_string }

    pub fn position(&self) -> Position {
        if self.ended() { Position::End } else { Position::At(self.query_string.clone()) }
    }
}

impl<C: CatalogConnection> Iterator for Query<'_, C> {
    type Item = Result<Vec<String>, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            CursorState::End | CursorState::LimitReached => return None,
            CursorState::Fresh => self.state = CursorState::Iterating,
            CursorState::Iterating => {
                if let Err(e) = self.advance() {
                    return Some(Err(e));
                }
                if self.ended() {
                    return None;
                }
            }
        }
        Some(Ok(self.executor.capture_results(self.row_idx)))
    }
}

/// Cursor position. Two positions are equal when both are at the end, or when they
/// belong to queries with the same text; only meaningful against [`Position::end`].
#[derive(Debug, Clone)]
pub enum Position {
    At(String),
    End,
}

impl Position {
    pub fn end() -> Self { Position::End }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Position::End, Position::End) => true,
            (Position::At(a), Position::At(b)) => a == b,
            _ => false,
        }
    }
}
