//! Error types for the SQL adapter.
//!
//! Every operation returns [`Error`] on failure. Each variant names the
//! operation that failed and, for operations that carry SQL, the statement
//! text that was attempted. The underlying engine error stays reachable
//! through [`std::error::Error::source`] and [`Error::sqlite`].

use std::num::TryFromIntError;

use rusqlite::types::FromSqlError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by database, transaction and cursor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The database file or driver could not be initialized.
    #[error("could not open the database {data_source:?}")]
    Open {
        data_source: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A non-query statement failed.
    #[error("could not execute sql statement {statement:?}")]
    Exec {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The statement ran but its affected-row count is not representable.
    #[error("could not get number of rows affected")]
    AffectedCount(#[source] TryFromIntError),

    /// A query could not be prepared or started.
    #[error("could not query rows {statement:?}")]
    Query {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Stepping a cursor to its next row failed.
    #[error("could not advance to the next row of {statement:?}")]
    Step {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not start a transaction")]
    Begin(#[source] rusqlite::Error),

    #[error("could not commit the transaction")]
    Commit(#[source] rusqlite::Error),

    #[error("could not abort the transaction")]
    Rollback(#[source] rusqlite::Error),

    /// The current row could not be decoded into the destinations.
    #[error("could not parse columns in current row")]
    Scan(#[source] ScanFailure),

    #[error("could not close the database {data_source:?}")]
    Close {
        data_source: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Why a [`Cursor::scan`](crate::Cursor::scan) call failed.
#[derive(Debug, Error)]
pub enum ScanFailure {
    #[error("expected {expected} destination arguments in scan, not {actual}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("scan called without a current row")]
    NoRow,

    #[error("converting column {index} ({column:?})")]
    Convert {
        index: usize,
        column: String,
        #[source]
        source: FromSqlError,
    },
}

impl Error {
    /// Returns the SQL text attached to this error, if the failing operation
    /// carried one.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Error::Exec { statement, .. }
            | Error::Query { statement, .. }
            | Error::Step { statement, .. } => Some(statement),
            _ => None,
        }
    }

    /// Returns the engine error at the root of this failure, if any.
    pub fn sqlite(&self) -> Option<&rusqlite::Error> {
        match self {
            Error::Open { source, .. }
            | Error::Exec { source, .. }
            | Error::Query { source, .. }
            | Error::Step { source, .. }
            | Error::Close { source, .. } => Some(source),
            Error::Begin(source) | Error::Commit(source) | Error::Rollback(source) => Some(source),
            Error::AffectedCount(_) | Error::Scan(_) | Error::Config(_) => None,
        }
    }

    /// Returns the SQLite result code of the root engine error, if any.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        self.sqlite().and_then(rusqlite::Error::sqlite_error_code)
    }
}
