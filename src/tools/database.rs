//! Database capabilities: read-only querying and schema listing.
//!
//! The read-only guard is a denylist over raw text tokens. It catches the
//! obvious cases and nothing more; it is not a substitute for a read-only
//! database role.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Maximum rows rendered into a query result.
pub const MAX_RENDERED_ROWS: usize = 10;

const DENYLIST: [&str; 7] = [
    "drop ",
    "delete ",
    "truncate ",
    "alter ",
    "update ",
    "insert ",
    "create ",
];

pub const BLOCKED_MESSAGE: &str =
    "❌ Unsafe SQL blocked. Only read-only queries are allowed (SELECT/WITH/EXPLAIN).";

/// One result row, column name to value.
pub type Row = Map<String, Value>;

/// Column metadata as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Table metadata as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// SQL engine the database tools run against.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
    async fn schema(&self) -> Result<Vec<TableSchema>>;
}

/// True if the query contains any denylisted token.
pub fn is_blocked(sql: &str) -> bool {
    let lower = sql.to_lowercase();
    DENYLIST.iter().any(|tok| lower.contains(tok))
}

pub async fn query_database(backend: &dyn SqlBackend, sql: &str) -> String {
    let sql = sql.trim();
    if is_blocked(sql) {
        tracing::warn!(sql, "blocked non read-only query");
        return BLOCKED_MESSAGE.to_string();
    }

    match backend.query(sql).await {
        Ok(rows) => render_rows(&rows),
        Err(e) => format!("❌ Database error: {e}"),
    }
}

pub async fn get_database_schema(backend: &dyn SqlBackend) -> String {
    match backend.schema().await {
        Ok(tables) => render_schema(&tables),
        Err(e) => format!("❌ Database error: {e}"),
    }
}

fn render_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "✅ Query executed but found no results".to_string();
    }

    let mut out = format!("✅ Query successful! Found {} rows:\n\n", rows.len());
    for row in rows.iter().take(MAX_RENDERED_ROWS) {
        out.push_str(&format!("• {}\n", Value::Object(row.clone())));
    }
    if rows.len() > MAX_RENDERED_ROWS {
        out.push_str(&format!("\n... and {} more rows", rows.len() - MAX_RENDERED_ROWS));
    }
    out
}

fn render_schema(tables: &[TableSchema]) -> String {
    if tables.is_empty() {
        return "No tables found in database.".to_string();
    }

    let mut out = String::from("📌 Database Schema:\n\n");
    for table in tables {
        out.push_str(&format!("=== {} ===\n", table.name));
        for col in &table.columns {
            let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
            let default = col
                .default
                .as_ref()
                .map(|d| format!("DEFAULT {d}"))
                .unwrap_or_default();
            out.push_str(&format!("  - {} ({}) {nullable} {default}\n", col.name, col.data_type));
        }
        out.push('\n');
    }
    out
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

#[cfg(feature = "sqlite")]
mod sqlite {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rusqlite::types::ValueRef;
    use rusqlite::Connection;
    use serde_json::{Map, Value};

    use super::{ColumnInfo, Row, SqlBackend, TableSchema};
    use crate::error::{Result, SwitchyardError};

    /// [`SqlBackend`] over a SQLite file.
    #[derive(Clone)]
    pub struct SqliteBackend {
        conn: Arc<Mutex<Connection>>,
    }

    impl SqliteBackend {
        /// Open (or create) the database at the given path.
        ///
        /// Pass `":memory:"` for an in-memory database (tests).
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let conn = Connection::open(path.as_ref()).map_err(db_error)?;
            Ok(Self::from_connection(conn))
        }

        pub fn from_connection(conn: Connection) -> Self {
            Self {
                conn: Arc::new(Mutex::new(conn)),
            }
        }

        /// Run a batch of statements directly, bypassing the read-only guard.
        pub fn execute_batch(&self, sql: &str) -> Result<()> {
            let conn = self.conn.lock().map_err(|_| lock_poisoned())?;
            conn.execute_batch(sql).map_err(db_error)
        }

        async fn with_conn<T, F>(&self, f: F) -> Result<T>
        where
            T: Send + 'static,
            F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        {
            let conn = Arc::clone(&self.conn);
            tokio::task::spawn_blocking(move || {
                let guard = conn.lock().map_err(|_| lock_poisoned())?;
                f(&guard).map_err(db_error)
            })
            .await
            .map_err(|e| SwitchyardError::tool("database", format!("query task failed: {e}")))?
        }
    }

    #[async_trait]
    impl SqlBackend for SqliteBackend {
        async fn query(&self, sql: &str) -> Result<Vec<Row>> {
            let sql = sql.to_string();
            self.with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut map = Map::new();
                    for (idx, name) in columns.iter().enumerate() {
                        map.insert(name.clone(), to_json(row.get_ref(idx)?));
                    }
                    out.push(map);
                }
                Ok(out)
            })
            .await
        }

        async fn schema(&self) -> Result<Vec<TableSchema>> {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut tables = Vec::with_capacity(names.len());
                for name in names {
                    let pragma = format!("PRAGMA table_info(\"{}\")", name.replace('"', "\"\""));
                    let mut info = conn.prepare(&pragma)?;
                    let columns = info
                        .query_map([], |row| {
                            Ok(ColumnInfo {
                                name: row.get(1)?,
                                data_type: row.get(2)?,
                                nullable: row.get::<_, i64>(3)? == 0,
                                default: row.get(4)?,
                            })
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    tables.push(TableSchema { name, columns });
                }
                Ok(tables)
            })
            .await
        }
    }

    fn to_json(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Value::from(f),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
        }
    }

    fn db_error(e: rusqlite::Error) -> SwitchyardError {
        SwitchyardError::tool("database", e.to_string())
    }

    fn lock_poisoned() -> SwitchyardError {
        SwitchyardError::tool("database", "connection lock poisoned")
    }
}
