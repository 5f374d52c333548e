//! General and stored ("specific") catalog queries.
//!
//! Both page the same way: the catalog hands back a continuation index with every
//! page, and a statement left open when the query is dropped is closed by resubmitting
//! the request with `max_rows = 0`.

use log::{debug, warn};

use crate::errors::{CAT_NO_ROWS_FOUND, CleanupFailure, QueryError};
use crate::query::connection::{
    CatalogConnection, GenQueryInput, GenQueryOutput, MAX_SPECIFIC_QUERY_ARGS, SpecificQueryInput,
};
use crate::query::executor::{PageOutcome, QueryExecutor};

/// A request the catalog can page through.
pub trait CatalogRequest {
    fn submit<C: CatalogConnection>(&self, conn: &mut C) -> Result<GenQueryOutput, i32>;
    fn set_continue_index(&mut self, idx: i32);
    fn set_max_rows(&mut self, rows: u32);
}

impl CatalogRequest for GenQueryInput {
    fn submit<C: CatalogConnection>(&self, conn: &mut C) -> Result<GenQueryOutput, i32> { conn.gen_query(self) }
    fn set_continue_index(&mut self, idx: i32) { self.continue_index = idx; }
    fn set_max_rows(&mut self, rows: u32) { self.max_rows = rows; }
}

impl CatalogRequest for SpecificQueryInput {
    fn submit<C: CatalogConnection>(&self, conn: &mut C) -> Result<GenQueryOutput, i32> { conn.specific_query(self) }
    fn set_continue_index(&mut self, idx: i32) { self.continue_index = idx; }
    fn set_max_rows(&mut self, rows: u32) { self.max_rows = rows; }
}

pub struct CatalogQuery<'c, C: CatalogConnection, R: CatalogRequest> {
    conn: &'c mut C,
    input: R,
    output: GenQueryOutput,
}

pub type GeneralQuery<'c, C> = CatalogQuery<'c, C, GenQueryInput>;
pub type SpecificQuery<'c, C> = CatalogQuery<'c, C, SpecificQueryInput>;

impl<'c, C: CatalogConnection> CatalogQuery<'c, C, GenQueryInput> {
    pub fn general(conn: &'c mut C, query: String, page_size: u32, offset: u64, zone_hint: Option<String>) -> Self {
        let input = GenQueryInput { query, max_rows: page_size, row_offset: offset, continue_index: 0, zone_hint };
        Self { conn, input, output: GenQueryOutput::default() }
    }
}

impl<'c, C: CatalogConnection> CatalogQuery<'c, C, SpecificQueryInput> {
    pub fn specific(
        conn: &'c mut C,
        sql: String,
        args: Vec<String>,
        page_size: u32,
        offset: u64,
        zone_hint: Option<String>,
    ) -> Result<Self, QueryError> {
        if args.len() > MAX_SPECIFIC_QUERY_ARGS {
            return Err(QueryError::invalid(format!(
                "specific query takes at most {} arguments, got {}",
                MAX_SPECIFIC_QUERY_ARGS,
                args.len()
            )));
        }
        let input = SpecificQueryInput { sql, args, max_rows: page_size, row_offset: offset, continue_index: 0, zone_hint };
        Ok(Self { conn, input, output: GenQueryOutput::default() })
    }
}

impl<C: CatalogConnection, R: CatalogRequest> QueryExecutor for CatalogQuery<'_, C, R> {
    fn fetch_page(&mut self) -> Result<PageOutcome, i32> {
        match self.input.submit(&mut *self.conn) {
            Ok(output) => {
                debug!("fetched page of {} rows, continuation index [{}]", output.row_count, output.continue_index);
                self.output = output;
                Ok(PageOutcome::Rows)
            }
            Err(CAT_NO_ROWS_FOUND) => {
                self.output = GenQueryOutput::default();
                Ok(PageOutcome::NoRows)
            }
            Err(code) => Err(code),
        }
    }

    fn reset_for_page_boundary(&mut self) { self.input.set_continue_index(self.output.continue_index); }

    fn capture_results(&self, row_idx: usize) -> Vec<String> {
        match self.output.row(row_idx) {
            Some(row) => row,
            None => panic!("row index {} out of range for a page of {} rows", row_idx, self.output.row_count),
        }
    }

    fn results_valid(&self) -> bool { self.output.row_count > 0 && !self.output.columns.is_empty() }

    fn query_complete(&self) -> bool { self.output.continue_index <= 0 }

    fn cont_idx(&self) -> i32 { self.output.continue_index }

    fn row_count(&self) -> usize { self.output.row_count }
}

impl<C: CatalogConnection, R: CatalogRequest> Drop for CatalogQuery<'_, C, R> {
    fn drop(&mut self) {
        let continue_index = self.output.continue_index;
        if continue_index <= 0 {
            return;
        }
        self.input.set_max_rows(0);
        self.input.set_continue_index(continue_index);
        match self.input.submit(&mut *self.conn) {
            Ok(_) | Err(CAT_NO_ROWS_FOUND) => debug!("closed statement with continuation index [{}]", continue_index),
            Err(code) => warn!("{}", CleanupFailure { continue_index, code }),
        }
    }
}
