//! Backend strategy interface
//!
//! The cursor drives every backend through [`QueryExecutor`]. Strategies are a closed
//! set chosen once when the query is opened, so dispatch is a plain `match` over
//! [`Executor`].

use super::connection::CatalogConnection;
#[cfg(feature = "experimental")]
use super::executors::ExperimentalQuery;
use super::executors::{GeneralQuery, SpecificQuery};

/// What a page fetch produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Rows,
    /// The backend reported "no rows found". Ends iteration cleanly.
    NoRows,
}

pub trait QueryExecutor {
    /// One blocking round trip. `Err` carries the native catalog code.
    fn fetch_page(&mut self) -> Result<PageOutcome, i32>;

    /// Prepare the next request after the current page has been consumed.
    fn reset_for_page_boundary(&mut self);

    /// Fields of one row of the current page, in selection order.
    ///
    /// # Panics
    /// When `row_idx` is outside the current page.
    fn capture_results(&self, row_idx: usize) -> Vec<String>;

    fn results_valid(&self) -> bool;

    /// No further page exists.
    fn query_complete(&self) -> bool;

    fn cont_idx(&self) -> i32;

    /// Rows in the current page.
    fn row_count(&self) -> usize;
}

pub enum Executor<'c, C: CatalogConnection> {
    General(GeneralQuery<'c, C>),
    Specific(SpecificQuery<'c, C>),
    #[cfg(feature = "experimental")]
    Experimental(ExperimentalQuery),
}

macro_rules! dispatch {
    ($self:expr, $q:ident => $body:expr) => {
        match $self {
            Executor::General($q) => $body,
            Executor::Specific($q) => $body,
            #[cfg(feature = "experimental")]
            Executor::Experimental($q) => $body,
        }
    };
}

impl<C: CatalogConnection> QueryExecutor for Executor<'_, C> {
    fn fetch_page(&mut self) -> Result<PageOutcome, i32> { dispatch!(self, q => q.fetch_page()) }
    fn reset_for_page_boundary(&mut self) { dispatch!(self, q => q.reset_for_page_boundary()) }
    fn capture_results(&self, row_idx: usize) -> Vec<String> { dispatch!(self, q => q.capture_results(row_idx)) }
    fn results_valid(&self) -> bool { dispatch!(self, q => q.results_valid()) }
    fn query_complete(&self) -> bool { dispatch!(self, q => q.query_complete()) }
    fn cont_idx(&self) -> i32 { dispatch!(self, q => q.cont_idx()) }
    fn row_count(&self) -> usize { dispatch!(self, q => q.row_count()) }
}
