//! Error taxonomy shared by the compiler and the query runtime.

/// Native catalog code for malformed input.
pub const SYS_INVALID_INPUT_PARAM: i32 = -130000;
/// Native catalog code for internal failures without a more specific code.
pub const SYS_INTERNAL_ERR: i32 = -154000;
/// Native catalog code for an unreachable or refusing catalog.
pub const CAT_CONNECT_ERR: i32 = -805000;
/// "No rows found" sentinel. Ends iteration cleanly, never surfaced as an error.
pub const CAT_NO_ROWS_FOUND: i32 = -808000;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid input: {0}")] InvalidInput(String),
    #[error("connection error: {0}")] Connection(String),
    #[error("backend execution error [{code}]: {message}")] BackendExecution { code: i32, message: String },
}

impl QueryError {
    pub fn invalid(msg: impl Into<String>) -> Self { QueryError::InvalidInput(msg.into()) }

    /// Native catalog code carried by this error.
    pub fn code(&self) -> i32 {
        match self {
            QueryError::InvalidInput(_) => SYS_INVALID_INPUT_PARAM,
            QueryError::Connection(_) => CAT_CONNECT_ERR,
            QueryError::BackendExecution { code, .. } => *code,
        }
    }
}

/// Failure to release a server-side cursor or statement during teardown.
///
/// Only ever written to the log; never returned to a caller.
#[derive(thiserror::Error, Debug)]
#[error("failed to close statement with continuation index [{continue_index}]: code {code}")]
pub struct CleanupFailure {
    pub continue_index: i32,
    pub code: i32,
}

#[cfg(feature = "experimental")]
impl From<sqlx::Error> for QueryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => QueryError::Connection(e.to_string()),
            _ => QueryError::BackendExecution { code: SYS_INTERNAL_ERR, message: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(QueryError::invalid("x").code(), SYS_INVALID_INPUT_PARAM);
        assert_eq!(QueryError::Connection("x".into()).code(), CAT_CONNECT_ERR);
        let e = QueryError::BackendExecution { code: -42, message: "boom".into() };
        assert_eq!(e.code(), -42);
        assert!(e.to_string().contains("boom"));
    }

    #[test]
    fn test_cleanup_failure_message() {
        let w = CleanupFailure { continue_index: 7, code: -1 };
        assert!(w.to_string().contains("[7]"));
    }
}
