//! HTTP surface of the report engine, one sub-module per resource.

pub mod artifacts;
pub mod data_sources;
pub mod reports;
pub mod templates;

use crate::db::SqliteDb;
use crate::services::reports::engine::ReportEngine;
use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};
use common::responses::ErrorResponse;
use std::path::PathBuf;

/// 10 MB, enough for large template bodies.
const JSON_LIMIT: usize = 10 * 1024 * 1024;

/// Malformed or oversized JSON bodies get the same `{error}` envelope as
/// every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            let body = ErrorResponse {
                error: format!("Invalid request body: {}", err),
            };
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

pub fn configure(
    cfg: &mut web::ServiceConfig,
    engine: ReportEngine,
    db: SqliteDb,
    storage_dir: PathBuf,
) {
    cfg.app_data(json_config())
        .app_data(web::Data::new(engine))
        .app_data(web::Data::new(db))
        .service(reports::configure_routes())
        .service(templates::configure_routes())
        .service(data_sources::configure_routes())
        .service(artifacts::configure_routes(storage_dir));
}
