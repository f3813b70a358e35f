use crate::db::SqliteDb;
use crate::error::ReportError;
use crate::services::reports::store::ReportStore;
use crate::services::templates::get::get_template;
use actix_web::{web, HttpResponse};
use common::model::report::GeneratedReport;
use common::requests::CreateReportRequest;
use common::responses::CreateReportResponse;
use log::info;
use uuid::Uuid;

/// Registers a pending report for an existing template.
pub async fn process(
    payload: web::Json<CreateReportRequest>,
    db: web::Data<SqliteDb>,
) -> Result<HttpResponse, ReportError> {
    let request = payload.into_inner();
    let db = db.get_ref().clone();
    let report_id = web::block(move || create_report(&db, request))
        .await
        .map_err(|e| ReportError::Internal(e.to_string()))??;

    info!("registered report {}", report_id);
    Ok(HttpResponse::Created().json(CreateReportResponse { report_id }))
}

pub fn create_report(db: &SqliteDb, request: CreateReportRequest) -> Result<String, ReportError> {
    let template_id = request.template_id.trim();
    if template_id.is_empty() {
        return Err(ReportError::BadRequest(
            "Template id must not be empty".to_string(),
        ));
    }
    if get_template(db, template_id)?.is_none() {
        return Err(ReportError::TemplateNotFound(template_id.to_string()));
    }

    let report_id = Uuid::new_v4().to_string();
    let report = GeneratedReport::pending(
        report_id.clone(),
        template_id,
        request.parameters,
        request.format,
    );
    db.create(&report)?;
    Ok(report_id)
}
