use crate::error::ReportError;
use crate::services::reports::engine::ReportEngine;
use actix_web::{web, HttpResponse};
use common::responses::ReportStatusResponse;

/// Returns the stored report record and how many runs are executing for it.
pub async fn process(
    report_id: web::Path<String>,
    engine: web::Data<ReportEngine>,
) -> Result<HttpResponse, ReportError> {
    let report_id = report_id.into_inner();
    let reports = engine.reports();
    let lookup = report_id.clone();
    let report = web::block(move || reports.get(&lookup))
        .await
        .map_err(|e| ReportError::Internal(e.to_string()))??
        .ok_or_else(|| ReportError::ReportNotFound(report_id.clone()))?;

    Ok(HttpResponse::Ok().json(ReportStatusResponse {
        in_flight: engine.runs().in_flight(&report_id),
        report,
    }))
}
