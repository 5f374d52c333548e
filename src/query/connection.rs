//! Catalog-side collaborator interface.
//!
//! The wire protocol behind [`CatalogConnection`] is not part of this crate; callers
//! supply an implementation (a network client, or an in-memory double in tests).

/// Default number of rows per catalog page.
pub const MAX_SQL_ROWS: u32 = 256;
/// Upper bound on positional arguments to a stored query.
pub const MAX_SPECIFIC_QUERY_ARGS: usize = 10;

/// Request for the general query entrypoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenQueryInput {
    pub query: String,
    /// Rows per page. Zero asks the catalog to close the statement named by `continue_index`.
    pub max_rows: u32,
    pub row_offset: u64,
    pub continue_index: i32,
    pub zone_hint: Option<String>,
}

/// Request for a stored query with positional arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecificQueryInput {
    pub sql: String,
    pub args: Vec<String>,
    pub max_rows: u32,
    pub row_offset: u64,
    pub continue_index: i32,
    pub zone_hint: Option<String>,
}

/// One page of results, stored column-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenQueryOutput {
    /// Greater than zero while the catalog holds further pages.
    pub continue_index: i32,
    pub row_count: usize,
    pub columns: Vec<Vec<String>>,
}

impl GenQueryOutput {
    /// Build a page from row-major data.
    pub fn from_rows(rows: &[Vec<String>], continue_index: i32) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let columns = (0..width).map(|c| rows.iter().map(|r| r[c].clone()).collect()).collect();
        Self { continue_index, row_count: rows.len(), columns }
    }

    /// Fields of row `idx` in selection order, if present.
    pub fn row(&self, idx: usize) -> Option<Vec<String>> {
        if idx >= self.row_count {
            return None;
        }
        self.columns.iter().map(|col| col.get(idx).cloned()).collect()
    }
}

/// Blocking round trips to the catalog. Errors are native catalog codes.
pub trait CatalogConnection {
    fn gen_query(&mut self, input: &GenQueryInput) -> Result<GenQueryOutput, i32>;
    fn specific_query(&mut self, input: &SpecificQueryInput) -> Result<GenQueryOutput, i32>;
}

impl<C: CatalogConnection + ?Sized> CatalogConnection for &mut C {
    fn gen_query(&mut self, input: &GenQueryInput) -> Result<GenQueryOutput, i32> { (**self).gen_query(input) }
    fn specific_query(&mut self, input: &SpecificQueryInput) -> Result<GenQueryOutput, i32> {
        (**self).specific_query(input)
    }
}
