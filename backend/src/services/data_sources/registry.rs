//! Resolution of data source codes to their table and field whitelist.

use crate::db::SqliteDb;
use crate::error::ReportError;
use crate::services::data_sources::get::get_data_source;
use common::model::datasource::DataSource;
use regex::Regex;

/// Read-only lookup shared by every run.
pub trait DataSourceRegistry: Send + Sync {
    /// Fails with `DataSourceNotFound` for an unknown code.
    fn resolve(&self, code: &str) -> Result<DataSource, ReportError>;
}

impl DataSourceRegistry for SqliteDb {
    fn resolve(&self, code: &str) -> Result<DataSource, ReportError> {
        get_data_source(self, code)?
            .ok_or_else(|| ReportError::DataSourceNotFound(code.to_string()))
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `table` or `schema.table`, each part a plain ASCII identifier.
const TABLE_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$";

/// Validates a base table name and returns it quoted.
pub fn quoted_table(base_table: &str) -> Result<String, ReportError> {
    let table_re = Regex::new(TABLE_PATTERN)
        .map_err(|e| ReportError::Internal(format!("Regex error: {}", e)))?;
    if !table_re.is_match(base_table) {
        return Err(ReportError::InvalidDataSource(format!(
            "base table {:?} is not a valid identifier",
            base_table
        )));
    }
    Ok(base_table
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join("."))
}
