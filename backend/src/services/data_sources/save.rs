use crate::db::SqliteDb;
use crate::error::ReportError;
use crate::services::data_sources::registry::quoted_table;
use actix_web::{web, HttpResponse};
use common::model::datasource::DataSource;
use rusqlite::params;

pub async fn process(
    payload: web::Json<DataSource>,
    db: web::Data<SqliteDb>,
) -> Result<HttpResponse, ReportError> {
    let db = db.get_ref().clone();
    let data_source = payload.into_inner();
    web::block(move || save_data_source(&db, &data_source))
        .await
        .map_err(|e| ReportError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "saved": true })))
}

/// Inserts or replaces a data source entry.
pub fn save_data_source(db: &SqliteDb, payload: &DataSource) -> Result<(), ReportError> {
    if payload.code.trim().is_empty() {
        return Err(ReportError::BadRequest(
            "Data source code must not be empty".to_string(),
        ));
    }
    quoted_table(&payload.base_table)?;

    let fields = serde_json::to_string(&payload.fields)
        .map_err(|e| ReportError::Internal(e.to_string()))?;
    let joins = serde_json::to_string(&payload.joins)
        .map_err(|e| ReportError::Internal(e.to_string()))?;

    let conn = db.open()?;
    conn.execute(
        "INSERT OR REPLACE INTO data_sources (code, base_table, fields, joins)
         VALUES (?1, ?2, ?3, ?4)",
        params![&payload.code, &payload.base_table, fields, joins],
    )?;
    Ok(())
}
