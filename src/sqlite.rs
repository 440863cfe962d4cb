//! SQLite implementation of the database, transaction and cursor traits.
//!
//! Every call is passed straight to `rusqlite`; failures are wrapped with the
//! operation and statement text, never retried.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Batch, Connection, Rows};
use tracing::{debug, trace, warn};

use crate::config::{BeginMode, SqliteConfig};
use crate::error::{Error, Result, ScanFailure};
use crate::traits::{Cursor, Database, Destination, Executor, Step, Transaction};
use crate::value::Value;

/// Opens the SQLite database at `data_source` with default settings.
///
/// Short for [`SqliteDatabase::open`].
pub fn open(data_source: &str) -> Result<SqliteDatabase> {
    SqliteDatabase::open(data_source)
}

/// A connection to one SQLite database.
///
/// The connection is closed when the handle is dropped. Use
/// [`SqliteDatabase::close`] to observe a failure to close, or
/// [`SqliteDatabase::scoped`] to tie the handle to a closure.
#[derive(Debug)]
pub struct SqliteDatabase {
    conn: Connection,
    data_source: String,
    begin_mode: BeginMode,
}

impl SqliteDatabase {
    /// Open (or create) the database at `data_source`.
    pub fn open(data_source: &str) -> Result<Self> {
        Self::open_with(&SqliteConfig::new(data_source))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Open the database described by `config` and apply its settings.
    pub fn open_with(config: &SqliteConfig) -> Result<Self> {
        config.validate()?;

        let open_error = |source: rusqlite::Error| Error::Open {
            data_source: config.data_source.clone(),
            source,
        };
        let conn = Connection::open_with_flags(&config.data_source, config.open_flags())
            .map_err(open_error)?;
        apply_settings(&conn, config).map_err(open_error)?;

        debug!(
            data_source = %config.data_source,
            read_only = config.read_only,
            "opened sqlite database"
        );
        Ok(Self {
            conn,
            data_source: config.data_source.clone(),
            begin_mode: config.begin_mode,
        })
    }

    /// Open the database, run `f` with it and close it again.
    ///
    /// The connection is released on every path out of `f`. An error from
    /// `f` takes precedence over an error from closing.
    pub fn scoped<T, F>(config: &SqliteConfig, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteDatabase) -> Result<T>,
    {
        let mut db = Self::open_with(config)?;
        let result = f(&mut db);
        let closed = db.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "close failed after scoped operation error");
                Err(err)
            }
        }
    }

    /// Close the connection, reporting any failure.
    pub fn close(self) -> Result<()> {
        let Self {
            conn, data_source, ..
        } = self;
        match conn.close() {
            Ok(()) => {
                debug!(data_source = %data_source, "closed sqlite database");
                Ok(())
            }
            Err((_conn, source)) => Err(Error::Close {
                data_source,
                source,
            }),
        }
    }

    /// Start a transaction with an explicit locking mode.
    pub fn begin_with(&mut self, mode: BeginMode) -> Result<SqliteTransaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(mode.into())
            .map_err(Error::Begin)?;
        debug!(mode = ?mode, "transaction started");
        Ok(SqliteTransaction { tx })
    }

    /// The identifier this database was opened with.
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// `false` while a transaction is open on this connection.
    pub fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}

impl Executor for SqliteDatabase {
    fn execute(&self, statement: &str, args: &[Value]) -> Result<i64> {
        execute_on(&self.conn, statement, args)
    }

    fn query<T, F>(&self, statement: &str, args: &[Value], f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T>,
    {
        query_on(&self.conn, statement, args, f)
    }
}

impl Database for SqliteDatabase {
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        self.begin_with(self.begin_mode)
    }
}

/// An open SQLite transaction.
///
/// Dropping it without calling [`Transaction::commit`] rolls it back.
pub struct SqliteTransaction<'db> {
    tx: rusqlite::Transaction<'db>,
}

impl Executor for SqliteTransaction<'_> {
    fn execute(&self, statement: &str, args: &[Value]) -> Result<i64> {
        execute_on(&self.tx, statement, args)
    }

    fn query<T, F>(&self, statement: &str, args: &[Value], f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T>,
    {
        query_on(&self.tx, statement, args, f)
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn commit(self) -> Result<()> {
        self.tx.commit().map_err(Error::Commit)?;
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback().map_err(Error::Rollback)?;
        debug!("transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for SqliteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction").finish_non_exhaustive()
    }
}

/// Cursor over the rows of a running SQLite query.
///
/// Each advance steps the statement once and reads that row's columns;
/// nothing beyond the current row is fetched.
pub struct SqliteCursor<'stmt> {
    statement: String,
    columns: Vec<String>,
    rows: Rows<'stmt>,
    current: Option<Vec<SqlValue>>,
    done: bool,
    err: Option<Error>,
}

impl<'stmt> SqliteCursor<'stmt> {
    fn new(statement: &str, columns: Vec<String>, rows: Rows<'stmt>) -> Self {
        Self {
            statement: statement.to_string(),
            columns,
            rows,
            current: None,
            done: false,
            err: None,
        }
    }

    fn step_error(&self, source: rusqlite::Error) -> Error {
        Error::Step {
            statement: self.statement.clone(),
            source,
        }
    }
}

impl Cursor for SqliteCursor<'_> {
    fn advance(&mut self) -> Result<Step> {
        if self.done {
            return Ok(Step::Done);
        }

        let width = self.columns.len();
        let stepped = match self.rows.next() {
            Ok(Some(row)) => (0..width)
                .map(|i| row.get_ref(i).map(SqlValue::from))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map(Some),
            Ok(None) => Ok(None),
            Err(source) => Err(source),
        };

        match stepped {
            Ok(Some(values)) => {
                self.current = Some(values);
                Ok(Step::Row)
            }
            Ok(None) => {
                self.current = None;
                self.done = true;
                Ok(Step::Done)
            }
            Err(source) => {
                self.current = None;
                self.done = true;
                Err(self.step_error(source))
            }
        }
    }

    fn next(&mut self) -> bool {
        match self.advance() {
            Ok(Step::Row) => true,
            Ok(Step::Done) => false,
            Err(err) => {
                debug!(error = %err, "cursor stopped on error");
                self.err = Some(err);
                false
            }
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn scan(&self, dest: &mut [&mut dyn Destination]) -> Result<()> {
        let row = self
            .current
            .as_ref()
            .ok_or(Error::Scan(ScanFailure::NoRow))?;
        if dest.len() != row.len() {
            return Err(Error::Scan(ScanFailure::ColumnCount {
                expected: row.len(),
                actual: dest.len(),
            }));
        }

        for (index, (slot, value)) in dest.iter_mut().zip(row).enumerate() {
            slot.assign(ValueRef::from(value)).map_err(|source| {
                Error::Scan(ScanFailure::Convert {
                    index,
                    column: self.columns[index].clone(),
                    source,
                })
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SqliteCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCursor")
            .field("statement", &self.statement)
            .field("columns", &self.columns)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

fn apply_settings(conn: &Connection, config: &SqliteConfig) -> rusqlite::Result<()> {
    if let Some(timeout) = config.busy_timeout() {
        conn.busy_timeout(timeout)?;
    }
    if config.foreign_keys {
        conn.pragma_update(None, "foreign_keys", true)?;
    }
    if let Some(mode) = config.journal_mode {
        // journal_mode answers with the mode actually in effect
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", mode.as_str(), |row| row.get(0))?;
    }
    Ok(())
}

fn execute_on(conn: &Connection, statement: &str, args: &[Value]) -> Result<i64> {
    trace!(statement, args = args.len(), "execute");
    let exec_error = |source: rusqlite::Error| Error::Exec {
        statement: statement.to_string(),
        source,
    };

    // Statements run in order, each taking its arguments from the front of `args`.
    let mut remaining = args;
    let mut affected = 0;
    let mut batch = Batch::new(conn, statement);
    while let Some(mut stmt) = batch.next().map_err(exec_error)? {
        let wanted = stmt.parameter_count();
        if wanted > remaining.len() {
            return Err(exec_error(rusqlite::Error::InvalidParameterCount(
                remaining.len(),
                wanted,
            )));
        }
        let (bound, rest) = remaining.split_at(wanted);
        remaining = rest;

        let mut rows = stmt.query(params_from_iter(bound)).map_err(exec_error)?;
        while rows.next().map_err(exec_error)?.is_some() {}
        affected = conn.changes();
    }
    if !remaining.is_empty() {
        return Err(exec_error(rusqlite::Error::InvalidParameterCount(
            args.len(),
            args.len() - remaining.len(),
        )));
    }
    i64::try_from(affected).map_err(Error::AffectedCount)
}

fn query_on<T, F>(conn: &Connection, statement: &str, args: &[Value], f: F) -> Result<T>
where
    F: FnOnce(&mut dyn Cursor) -> Result<T>,
{
    trace!(statement, args = args.len(), "query");
    let query_error = |source: rusqlite::Error| Error::Query {
        statement: statement.to_string(),
        source,
    };

    let mut stmt = conn.prepare(statement).map_err(query_error)?;
    let columns = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let rows = stmt.query(params_from_iter(args)).map_err(query_error)?;

    let mut cursor = SqliteCursor::new(statement, columns, rows);
    f(&mut cursor)
}
