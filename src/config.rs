//! Connection configuration.

use std::time::Duration;

use rusqlite::{OpenFlags, TransactionBehavior};
use serde::Deserialize;

use crate::error::{Error, Result};

/// SQLite journal modes settable through `PRAGMA journal_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "delete",
            JournalMode::Truncate => "truncate",
            JournalMode::Persist => "persist",
            JournalMode::Memory => "memory",
            JournalMode::Wal => "wal",
            JournalMode::Off => "off",
        }
    }
}

/// Locking behavior of `BEGIN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeginMode {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl From<BeginMode> for TransactionBehavior {
    fn from(mode: BeginMode) -> Self {
        match mode {
            BeginMode::Deferred => TransactionBehavior::Deferred,
            BeginMode::Immediate => TransactionBehavior::Immediate,
            BeginMode::Exclusive => TransactionBehavior::Exclusive,
        }
    }
}

/// SQLite database configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path, `file:` URI or `:memory:`
    pub data_source: String,
    /// Open the database without write access
    pub read_only: bool,
    /// Create the file when it does not exist (ignored when read-only)
    pub create_if_missing: bool,
    /// How long to wait on a locked database before failing, in milliseconds
    pub busy_timeout_ms: Option<u64>,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    pub journal_mode: Option<JournalMode>,
    /// Mode used by `begin()`
    pub begin_mode: BeginMode,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            data_source: ":memory:".to_string(),
            read_only: false,
            create_if_missing: true,
            busy_timeout_ms: None,
            foreign_keys: false,
            journal_mode: None,
            begin_mode: BeginMode::Deferred,
        }
    }
}

impl SqliteConfig {
    /// Create a config for `data_source` with default settings
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            ..Self::default()
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    pub fn with_begin_mode(mut self, mode: BeginMode) -> Self {
        self.begin_mode = mode;
        self
    }

    /// Check the settings before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if let Some(ms) = self.busy_timeout_ms {
            // sqlite3_busy_timeout takes a C int of milliseconds
            if i32::try_from(ms).is_err() {
                return Err(Error::Config(format!(
                    "busy_timeout_ms {ms} exceeds {} ms",
                    i32::MAX
                )));
            }
        }
        if self.read_only && self.journal_mode == Some(JournalMode::Wal) {
            return Err(Error::Config(
                "journal_mode wal cannot be set on a read-only connection".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if self.create_if_missing {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        flags
    }
}
