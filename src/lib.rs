//! Uniform SQL database access for the Runar ecosystem, backed by SQLite.
//!
//! # Intention
//!
//! - Expose a connection, a transaction and a result cursor through a small
//!   set of traits ([`Executor`], [`Database`], [`Transaction`], [`Cursor`]).
//! - Delegate all SQL work to the embedded engine; only add error context.
//!
//! # Architectural Boundaries
//!
//! - Only database access code belongs here.
//! - No query building, schema management, pooling or retries.
//!
//! # Example
//!
//! ```
//! use runar_sql::{params, Database, Executor, Transaction};
//!
//! # fn main() -> runar_sql::Result<()> {
//! let mut db = runar_sql::open(":memory:")?;
//!
//! let tx = db.begin()?;
//! tx.execute("CREATE TABLE t (id INTEGER)", params![])?;
//! assert_eq!(tx.execute("INSERT INTO t VALUES (?)", params![1])?, 1);
//! tx.commit()?;
//!
//! let ids = db.query("SELECT id FROM t", params![], |rows| {
//!     let mut ids = Vec::new();
//!     while rows.next() {
//!         let mut id = 0_i64;
//!         rows.scan(&mut [&mut id])?;
//!         ids.push(id);
//!     }
//!     Ok(ids)
//! })?;
//! assert_eq!(ids, vec![1]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod sqlite;
pub mod traits;
pub mod value;

pub use config::{BeginMode, JournalMode, SqliteConfig};
pub use error::{Error, Result, ScanFailure};
pub use sqlite::{open, SqliteCursor, SqliteDatabase, SqliteTransaction};
pub use traits::{Cursor, Database, Destination, Executor, Step, Transaction};
pub use value::Value;
