use crate::db::SqliteDb;
use crate::error::ReportError;
use actix_web::{web, HttpResponse};
use common::model::template::ReportTemplate;
use rusqlite::params;

pub async fn process(
    payload: web::Json<ReportTemplate>,
    db: web::Data<SqliteDb>,
) -> Result<HttpResponse, ReportError> {
    let db = db.get_ref().clone();
    let template = payload.into_inner();
    web::block(move || save_template(&db, &template))
        .await
        .map_err(|e| ReportError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "saved": true })))
}

/// Inserts or replaces a template.
pub fn save_template(db: &SqliteDb, payload: &ReportTemplate) -> Result<(), ReportError> {
    if payload.id.trim().is_empty() {
        return Err(ReportError::BadRequest(
            "Template id must not be empty".to_string(),
        ));
    }
    if payload.data_source.trim().is_empty() {
        return Err(ReportError::BadRequest(
            "Template data source must not be empty".to_string(),
        ));
    }

    let to_json = |value: Result<String, serde_json::Error>| {
        value.map_err(|e| ReportError::Internal(e.to_string()))
    };
    let fields = to_json(serde_json::to_string(&payload.fields))?;
    let layout = to_json(serde_json::to_string(&payload.layout))?;
    let page_settings = to_json(serde_json::to_string(&payload.page_settings))?;

    let conn = db.open()?;
    conn.execute(
        "INSERT OR REPLACE INTO report_templates
            (id, name, data_source, sql_query, fields, layout, page_settings)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &payload.id,
            &payload.name,
            &payload.data_source,
            &payload.sql_query,
            fields,
            layout,
            page_settings
        ],
    )?;
    Ok(())
}
