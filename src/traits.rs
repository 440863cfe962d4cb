//! Engine-neutral database capabilities.
//!
//! [`Executor`] is shared by databases and transactions, [`Database`] adds
//! `begin`, and [`Cursor`] walks the rows of a query. [`crate::sqlite`]
//! provides the only implementation today.

use rusqlite::types::{FromSql, FromSqlResult, ValueRef};

use crate::error::{Error, Result};
use crate::value::Value;

/// Outcome of advancing a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A row is available for [`Cursor::scan`].
    Row,
    /// The result set is exhausted.
    Done,
}

/// Runs statements and queries with positional `?` arguments.
pub trait Executor {
    /// Executes a non-query statement and returns the number of rows affected.
    fn execute(&self, statement: &str, args: &[Value]) -> Result<i64>;

    /// Runs a query and hands a live cursor over its rows to `f`.
    ///
    /// The cursor is valid only inside `f`; the underlying statement is
    /// released when `f` returns, whatever it returns.
    fn query<T, F>(&self, statement: &str, args: &[Value], f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T>;
}

/// A database connection handle.
pub trait Database: Executor {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Starts a transaction. The handle stays borrowed until it is finalized.
    fn begin(&mut self) -> Result<Self::Tx<'_>>;
}

/// A unit of work finalized by exactly one of `commit` or `rollback`.
pub trait Transaction: Executor {
    fn commit(self) -> Result<()>;

    fn rollback(self) -> Result<()>;
}

/// Forward-only iteration over the rows of a query.
pub trait Cursor {
    /// Steps to the next row, reporting errors instead of hiding them.
    ///
    /// A step error ends iteration: it is returned once, and every later
    /// call returns `Ok(Step::Done)`.
    fn advance(&mut self) -> Result<Step>;

    /// Steps to the next row. Returns `false` both when the rows are exhausted
    /// and when stepping failed; check [`Cursor::err`] after the loop.
    fn next(&mut self) -> bool;

    /// The error that ended iteration through [`Cursor::next`], if any.
    fn err(&self) -> Option<&Error>;

    /// Result column names, in order.
    fn columns(&self) -> &[String];

    /// Decodes the current row into `dest`, one destination per column.
    ///
    /// Conversion follows [`FromSql`] strictly: a column only decodes into a
    /// destination of a matching storage class. An INTEGER column does not
    /// scan into a `String` and TEXT does not scan into an `i64`; scan into
    /// [`Value`] to accept any class.
    fn scan(&self, dest: &mut [&mut dyn Destination]) -> Result<()>;

    /// Decodes the current row into owned values.
    fn values(&self) -> Result<Vec<Value>> {
        let mut values = vec![Value::Null; self.columns().len()];
        {
            let mut dest: Vec<&mut dyn Destination> = values
                .iter_mut()
                .map(|v| v as &mut dyn Destination)
                .collect();
            self.scan(&mut dest)?;
        }
        Ok(values)
    }
}

/// A slot that a column value can be decoded into.
pub trait Destination {
    fn assign(&mut self, value: ValueRef<'_>) -> FromSqlResult<()>;
}

impl<T: FromSql> Destination for T {
    fn assign(&mut self, value: ValueRef<'_>) -> FromSqlResult<()> {
        *self = T::column_result(value)?;
        Ok(())
    }
}
