//! Ad-hoc SQL over a server-side cursor.
//!
//! The compiled SQL runs inside an explicit transaction; pages come from
//! `FETCH <n> FROM gq_cur` and the transaction is committed when the query is dropped.

use log::{debug, error, warn};

use crate::db::{SqlRunner, SqlSession, declare_statement, fetch_statement};
use crate::errors::QueryError;
use crate::query::executor::{PageOutcome, QueryExecutor};

pub struct ExperimentalQuery {
    session: SqlSession,
    page_size: u64,
    rows: Vec<Vec<String>>,
    exhausted: bool,
}

impl ExperimentalQuery {
    pub fn open(mut session: SqlSession, sql: &str, limit: u64, offset: u64, page_size: u32) -> Result<Self, QueryError> {
        session.execute("BEGIN;")?;
        session.execute(&declare_statement(sql, limit, offset))?;
        Ok(Self { session, page_size: effective_page_size(limit, page_size), rows: Vec::new(), exhausted: false })
    }
}

/// Rows per `FETCH`: the limit when it is smaller than the page size.
pub fn effective_page_size(limit: u64, page_size: u32) -> u64 {
    if limit > 0 { limit.min(u64::from(page_size)) } else { u64::from(page_size) }
}

impl QueryExecutor for ExperimentalQuery {
    fn fetch_page(&mut self) -> Result<PageOutcome, i32> {
        match self.session.fetch(&fetch_statement(self.page_size)) {
            Ok(rows) if rows.is_empty() => {
                self.rows.clear();
                self.exhausted = true;
                Ok(PageOutcome::NoRows)
            }
            Ok(rows) => {
                self.exhausted = (rows.len() as u64) < self.page_size;
                debug!("fetched {} rows from cursor", rows.len());
                self.rows = rows;
                Ok(PageOutcome::Rows)
            }
            Err(e) => {
                let err = QueryError::from(e);
                error!("cursor fetch failed: {}", err);
                Err(err.code())
            }
        }
    }

    fn reset_for_page_boundary(&mut self) { self.rows.clear(); }

    fn capture_results(&self, row_idx: usize) -> Vec<String> {
        match self.rows.get(row_idx) {
            Some(row) => row.clone(),
            None => panic!("row index {} out of range for a page of {} rows", row_idx, self.rows.len()),
        }
    }

    fn results_valid(&self) -> bool { !self.rows.is_empty() }

    fn query_complete(&self) -> bool { self.exhausted }

    fn cont_idx(&self) -> i32 { if self.exhausted { 0 } else { 1 } }

    fn row_count(&self) -> usize { self.rows.len() }
}

impl Drop for ExperimentalQuery {
    fn drop(&mut self) {
        if let Err(e) = self.session.execute("COMMIT;") {
            warn!("failed to commit cursor transaction: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_page_size() {
        assert_eq!(effective_page_size(0, 256), 256);
        assert_eq!(effective_page_size(10, 256), 10);
        assert_eq!(effective_page_size(1000, 256), 256);
    }
}
