//! SQLite handle shared by the catalog, the report records and the query backend.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS report_templates (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    data_source   TEXT NOT NULL,
    sql_query     TEXT,
    fields        TEXT NOT NULL DEFAULT '[]',
    layout        TEXT NOT NULL DEFAULT '{}',
    page_settings TEXT NOT NULL DEFAULT '{}'
);
CREATE TABLE IF NOT EXISTS data_sources (
    code       TEXT PRIMARY KEY,
    base_table TEXT NOT NULL,
    fields     TEXT NOT NULL DEFAULT '[]',
    joins      TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS generated_reports (
    id            TEXT PRIMARY KEY,
    template_id   TEXT NOT NULL,
    parameters    TEXT NOT NULL DEFAULT '{}',
    format        TEXT NOT NULL,
    status        TEXT NOT NULL,
    row_count     INTEGER,
    file_url      TEXT,
    error_message TEXT,
    run_count     INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
";

/// Opens a fresh connection per operation, so the handle is cheap to clone
/// into blocking tasks.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    path: PathBuf,
}

impl SqliteDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteDb { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    pub fn init_schema(&self) -> rusqlite::Result<()> {
        self.open()?.execute_batch(SCHEMA)
    }
}
