//! # Data Source Retrieval Service
//!
//! Backs `GET /api/data_sources/{code}` and the registry lookup used by the
//! report engine. Field and join descriptors are stored as JSON text next to
//! the base table name.

use crate::db::SqliteDb;
use crate::error::ReportError;
use actix_web::{web, HttpResponse};
use common::model::datasource::DataSource;
use rusqlite::{params, OptionalExtension};

pub async fn process(
    code: web::Path<String>,
    db: web::Data<SqliteDb>,
) -> Result<HttpResponse, ReportError> {
    let code = code.into_inner();
    let db = db.get_ref().clone();
    let lookup = code.clone();
    let data_source = web::block(move || get_data_source(&db, &lookup))
        .await
        .map_err(|e| ReportError::Internal(e.to_string()))??;

    match data_source {
        Some(ds) => Ok(HttpResponse::Ok().json(ds)),
        None => Err(ReportError::DataSourceNotFound(code)),
    }
}

/// Fetches a data source by code. `Ok(None)` when no entry exists.
pub fn get_data_source(db: &SqliteDb, code: &str) -> Result<Option<DataSource>, ReportError> {
    let conn = db.open()?;
    let row = conn
        .query_row(
            "SELECT code, base_table, fields, joins FROM data_sources WHERE code = ?1",
            params![code],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((code, base_table, fields, joins)) = row else {
        return Ok(None);
    };

    Ok(Some(DataSource {
        code,
        base_table,
        fields: serde_json::from_str(&fields)
            .map_err(|e| ReportError::Store(format!("corrupt field list: {}", e)))?,
        joins: serde_json::from_str(&joins)
            .map_err(|e| ReportError::Store(format!("corrupt join list: {}", e)))?,
    }))
}
