//! Store collaborators.
//!
//! The loader and the integrator only need two capabilities from the database:
//! executing a single statement ([`StatementExecutor`]) and walking the result
//! of a query lazily ([`RowSource`]). [`SqliteStore`] provides both on top of
//! one `rusqlite` connection.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::{Connection, types::Value as SqliteValue};
use thiserror::Error;

const STATEMENT_PREVIEW_CHARS: usize = 160;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Opening database {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Executing `{statement}`")]
    Execute {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Querying `{query}`")]
    Query {
        query: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Committing transaction")]
    Commit(#[source] rusqlite::Error),
}

fn preview(statement: &str) -> String {
    if statement.chars().count() <= STATEMENT_PREVIEW_CHARS {
        statement.to_string()
    } else {
        let head: String = statement.chars().take(STATEMENT_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

/// A single cell returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StoreValue {
    pub fn as_text(&self) -> Option<String> {
        match self {
            StoreValue::Null => None,
            StoreValue::Integer(value) => Some(value.to_string()),
            StoreValue::Real(value) => Some(value.to_string()),
            StoreValue::Text(value) => Some(value.clone()),
        }
    }

    /// Integer view of the cell; reals are accepted only without a fraction.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoreValue::Integer(value) => Some(*value),
            StoreValue::Real(value) if value.fract() == 0.0 => Some(*value as i64),
            StoreValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            StoreValue::Integer(value) => Some(*value as f64),
            StoreValue::Real(value) => Some(*value),
            StoreValue::Text(value) => value.trim().parse().ok(),
            StoreValue::Null => None,
        }
    }
}

impl From<SqliteValue> for StoreValue {
    fn from(value: SqliteValue) -> Self {
        match value {
            SqliteValue::Null => StoreValue::Null,
            SqliteValue::Integer(v) => StoreValue::Integer(v),
            SqliteValue::Real(v) => StoreValue::Real(v),
            SqliteValue::Text(v) => StoreValue::Text(v),
            SqliteValue::Blob(bytes) => StoreValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

pub type Record = Vec<StoreValue>;

/// Lazy, single-pass sequence of query results; `None` means exhausted.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

pub trait StatementExecutor {
    /// Executes one statement and returns the number of affected rows.
    fn execute(&self, statement: &str) -> Result<usize>;

    /// Makes everything executed since the previous commit durable.
    fn commit(&self) -> Result<()>;

    fn table_exists(&self, table: &str) -> Result<bool>;
}

pub trait RowSource {
    /// Runs `query` and hands its rows to `consume` as a lazy stream.
    fn stream_rows<T, F>(&self, query: &str, consume: F) -> Result<T>
    where
        F: FnOnce(RowStream<'_>) -> Result<T>;

    fn first_row(&self, query: &str) -> Result<Option<Record>> {
        self.stream_rows(query, |mut rows| rows.next().transpose())
    }
}

/// SQLite-backed store.
///
/// A transaction is opened implicitly by the first statement after a commit,
/// so commit boundaries are entirely up to the caller. Work that was never
/// committed is discarded by SQLite when the connection closes.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

impl StatementExecutor for SqliteStore {
    fn execute(&self, statement: &str) -> Result<usize> {
        let to_error = |source| StoreError::Execute {
            statement: preview(statement),
            source,
        };
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN").map_err(to_error)?;
        }
        let affected = self.conn.execute(statement, []).map_err(to_error)?;
        Ok(affected)
    }

    fn commit(&self) -> Result<()> {
        if self.in_transaction() {
            self.conn
                .execute_batch("COMMIT")
                .map_err(StoreError::Commit)?;
        }
        Ok(())
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let query = "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE)";
        let exists = self
            .conn
            .query_row(query, [table], |row| row.get(0))
            .map_err(|source| StoreError::Query {
                query: query.to_string(),
                source,
            })?;
        Ok(exists)
    }
}

impl RowSource for SqliteStore {
    fn stream_rows<T, F>(&self, query: &str, consume: F) -> Result<T>
    where
        F: FnOnce(RowStream<'_>) -> Result<T>,
    {
        let to_error = |source| StoreError::Query {
            query: preview(query),
            source,
        };
        let mut statement = self.conn.prepare(query).map_err(to_error)?;
        let width = statement.column_count();
        let rows = statement
            .query_map([], move |row| {
                (0..width)
                    .map(|idx| row.get::<_, SqliteValue>(idx).map(StoreValue::from))
                    .collect::<rusqlite::Result<Record>>()
            })
            .map_err(to_error)?;
        let stream: RowStream<'_> = Box::new(rows.map(|row| row.map_err(anyhow::Error::from)));
        let outcome = consume(stream)?;
        Ok(outcome)
    }
}
