//! # Template Retrieval Service
//!
//! Fetches a `ReportTemplate` by id for `GET /api/templates/{template_id}`
//! and for the report engine. The declared field list, layout bands and page
//! settings are stored as JSON text columns.

use crate::db::SqliteDb;
use crate::error::ReportError;
use actix_web::{web, HttpResponse};
use common::model::template::ReportTemplate;
use rusqlite::{params, OptionalExtension};

/// Actix web handler for `GET /api/templates/{template_id}`.
///
/// # Returns
/// - `200 OK` with the template as JSON.
/// - `404 Not Found` when no template has that id.
pub async fn process(
    template_id: web::Path<String>,
    db: web::Data<SqliteDb>,
) -> Result<HttpResponse, ReportError> {
    let template_id = template_id.into_inner();
    let db = db.get_ref().clone();
    let lookup = template_id.clone();
    let template = web::block(move || get_template(&db, &lookup))
        .await
        .map_err(|e| ReportError::Internal(e.to_string()))??;

    match template {
        Some(t) => Ok(HttpResponse::Ok().json(t)),
        None => Err(ReportError::TemplateNotFound(template_id)),
    }
}

/// Fetches a template. `Ok(None)` when it does not exist.
pub fn get_template(
    db: &SqliteDb,
    template_id: &str,
) -> Result<Option<ReportTemplate>, ReportError> {
    let conn = db.open()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, data_source, sql_query, fields, layout, page_settings
         FROM report_templates WHERE id = ?1",
    )?;
    let row = stmt
        .query_row(params![template_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .optional()?;

    let Some((id, name, data_source, sql_query, fields, layout, page_settings)) = row else {
        return Ok(None);
    };

    Ok(Some(ReportTemplate {
        id,
        name,
        data_source,
        sql_query,
        fields: parse_column(&fields, "fields")?,
        layout: parse_column(&layout, "layout")?,
        page_settings: parse_column(&page_settings, "page_settings")?,
    }))
}

fn parse_column<T: serde::de::DeserializeOwned>(raw: &str, column: &str) -> Result<T, ReportError> {
    serde_json::from_str(raw)
        .map_err(|e| ReportError::Store(format!("corrupt template column {}: {}", column, e)))
}
