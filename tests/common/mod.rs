#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, Once};

use catalog_query::errors::CAT_NO_ROWS_FOUND;
use catalog_query::query::{CatalogConnection, GenQueryInput, GenQueryOutput, SpecificQueryInput};
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;

/// In-memory catalog that pages through a fixed row set the way the real catalog does.
#[derive(Default)]
pub struct MockCatalog {
    pub rows: Vec<Vec<String>>,
    /// Page requests served (close calls excluded).
    pub fetches: usize,
    /// Continuation indexes of close calls, in order.
    pub closes: Vec<i32>,
    /// Code returned by every close call.
    pub close_failure: Option<i32>,
    /// Fail the n-th page request (0-based) with the given code.
    pub fail_on_fetch: Option<(usize, i32)>,
    pub last_gen: Option<GenQueryInput>,
    pub last_specific: Option<SpecificQueryInput>,
    next_token: i32,
    cursors: HashMap<i32, usize>,
}

impl MockCatalog {
    pub fn with_rows(n: usize) -> Self {
        Self { rows: (0..n).map(|i| vec![format!("name{}", i), i.to_string()]).collect(), ..Default::default() }
    }

    fn page(&mut self, max_rows: u32, row_offset: u64, continue_index: i32) -> Result<GenQueryOutput, i32> {
        if max_rows == 0 {
            self.closes.push(continue_index);
            self.cursors.remove(&continue_index);
            return match self.close_failure {
                Some(code) => Err(code),
                None => Ok(GenQueryOutput::default()),
            };
        }

        let fetch_no = self.fetches;
        self.fetches += 1;
        if let Some((n, code)) = self.fail_on_fetch
            && n == fetch_no
        {
            return Err(code);
        }

        let start = if continue_index > 0 {
            self.cursors.remove(&continue_index).ok_or(-1)?
        } else {
            row_offset as usize
        };
        if start >= self.rows.len() {
            return Err(CAT_NO_ROWS_FOUND);
        }
        let end = (start + max_rows as usize).min(self.rows.len());
        let token = if end < self.rows.len() {
            self.next_token += 1;
            self.cursors.insert(self.next_token, end);
            self.next_token
        } else {
            0
        };
        Ok(GenQueryOutput::from_rows(&self.rows[start..end], token))
    }
}

impl CatalogConnection for MockCatalog {
    fn gen_query(&mut self, input: &GenQueryInput) -> Result<GenQueryOutput, i32> {
        if input.max_rows > 0 {
            self.last_gen = Some(input.clone());
        }
        self.page(input.max_rows, input.row_offset, input.continue_index)
    }

    fn specific_query(&mut self, input: &SpecificQueryInput) -> Result<GenQueryOutput, i32> {
        if input.max_rows > 0 {
            self.last_specific = Some(input.clone());
        }
        self.page(input.max_rows, input.row_offset, input.continue_index)
    }
}

/// Process-wide logger that keeps every record for later inspection.
pub struct CapturingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl CapturingLogger {
    /// Records at `level` whose message contains `needle`.
    pub fn count(&self, level: Level, needle: &str) -> usize {
        match self.records.lock() {
            Ok(records) => records.iter().filter(|(l, m)| *l == level && m.contains(needle)).count(),
            Err(_) => 0,
        }
    }
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool { true }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: Lazy<CapturingLogger> = Lazy::new(|| CapturingLogger { records: Mutex::new(Vec::new()) });
static INIT: Once = Once::new();

pub fn logger() -> &'static CapturingLogger {
    INIT.call_once(|| {
        let _ = log::set_logger(&*LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    &LOGGER
}
