//! Blocking SQL session over a single Postgres connection.
//!
//! Server-side cursors only live inside one transaction on one connection, so the
//! session owns exactly one `PgConnection` and a current-thread runtime to drive it.

use log::debug;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Connection, Row};

use crate::config::DatabaseConfig;
use crate::errors::QueryError;

/// Name of the server-side cursor declared for paged queries.
pub const CURSOR_NAME: &str = "gq_cur";

pub struct SqlSession {
    runtime: tokio::runtime::Runtime,
    conn: PgConnection,
}

impl SqlSession {
    pub fn connect(config: &DatabaseConfig) -> Result<Self, QueryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| QueryError::Connection(e.to_string()))?;
        let options = config.connect_options()?;
        let conn = runtime
            .block_on(PgConnection::connect_with(&options))
            .map_err(|e| QueryError::Connection(e.to_string()))?;
        debug!("connected to catalog database [{}]", config.instance);
        Ok(Self { runtime, conn })
    }
}

/// Runs raw statements against the catalog database.
pub trait SqlRunner {
    /// Run one statement, discarding any rows.
    fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error>;

    /// Run one statement and return every row as strings.
    fn fetch(&mut self, sql: &str) -> Result<Vec<Vec<String>>, sqlx::Error>;
}

impl SqlRunner for SqlSession {
    fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        debug!("SQL: {}", sql);
        self.runtime.block_on(sqlx::raw_sql(sql).execute(&mut self.conn)).map(|_| ())
    }

    fn fetch(&mut self, sql: &str) -> Result<Vec<Vec<String>>, sqlx::Error> {
        debug!("SQL: {}", sql);
        let rows = self.runtime.block_on(sqlx::raw_sql(sql).fetch_all(&mut self.conn))?;
        Ok(rows.iter().map(row_to_strings).collect())
    }
}

fn row_to_strings(row: &PgRow) -> Vec<String> {
    (0..row.columns().len())
        .map(|i| {
            if let Ok(v) = row.try_get::<Option<String>, _>(i) {
                v.unwrap_or_default()
            } else if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
                v.map(|n| n.to_string()).unwrap_or_default()
            } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
                v.map(|n| n.to_string()).unwrap_or_default()
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
                v.map(|n| n.to_string()).unwrap_or_default()
            } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
                v.map(|b| b.to_string()).unwrap_or_default()
            } else {
                String::new()
            }
        })
        .collect()
}

/// `DECLARE gq_cur CURSOR FOR <sql>[ LIMIT n][ OFFSET n];`
pub fn declare_statement(sql: &str, limit: u64, offset: u64) -> String {
    let mut stmt = format!("DECLARE {} CURSOR FOR {}", CURSOR_NAME, sql);
    push_window(&mut stmt, limit, offset);
    stmt.push(';');
    stmt
}

/// `FETCH <rows> FROM gq_cur;`
pub fn fetch_statement(rows: u64) -> String { format!("FETCH {} FROM {};", rows, CURSOR_NAME) }

pub(crate) fn push_window(stmt: &mut String, limit: u64, offset: u64) {
    if limit > 0 {
        stmt.push_str(&format!(" LIMIT {}", limit));
    }
    if offset > 0 {
        stmt.push_str(&format!(" OFFSET {}", offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_statement() {
        assert_eq!(declare_statement("SELECT 1", 0, 0), "DECLARE gq_cur CURSOR FOR SELECT 1;");
        assert_eq!(declare_statement("SELECT 1", 10, 5), "DECLARE gq_cur CURSOR FOR SELECT 1 LIMIT 10 OFFSET 5;");
    }

    #[test]
    fn test_fetch_statement() {
        assert_eq!(fetch_statement(256), "FETCH 256 FROM gq_cur;");
    }
}
