//! Storage layer: a single SQLite database holding the ledger, the stats
//! projection and every producer's records.
//!
//! # Locking
//!
//! [`Store::write`] runs its closure inside an `IMMEDIATE` transaction, so
//! the database write lock is held from the first read to commit. Every
//! read-then-write operation (award, allocate, attack, focus start/stop)
//! runs entirely inside one `write` call; that is the lock scope that keeps
//! two concurrent requests for the same user from both acting on a stale
//! read. Returning `Err` from the closure rolls everything back.
//!
//! # Modules
//!
//! - [`schema`]: tables, partial unique indexes, append-only triggers.

pub mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};

use crate::error::{ProgressError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Declare a closed enum stored as a text tag.
///
/// Generates `as_str`/`parse`/`ALL`, `Display`, serde in snake_case, and the
/// rusqlite `ToSql`/`FromSql` impls. `parse` errors name `$field` so they
/// surface as validation errors on the right input.
macro_rules! sql_text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $field:literal {
            $($(#[$vmeta:meta])* $variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            pub fn parse(s: &str) -> $crate::error::Result<Self> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    other => Err($crate::error::ProgressError::invalid(
                        $field,
                        format!("unknown {} '{}'", $field, other),
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let tag = value.as_str()?;
                Self::parse(tag).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub(crate) use sql_text_enum;

/// SQLite-backed store shared by all engine operations.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::info!("opening database at {}", path.display());

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_in_memory() -> Result<Self> {
        log::debug!("opening in-memory database");
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ProgressError::Storage(format!("connection lock poisoned: {e}")))
    }

    /// Run a read-only closure against the connection.
    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside an `IMMEDIATE` transaction; commit on `Ok`, roll back
    /// on `Err`.
    pub fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}
