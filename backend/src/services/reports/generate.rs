//! # Report Generation Service
//!
//! `POST /api/reports/generate` runs the engine for an existing report and
//! answers with the rows inline, whether or not the artifact upload worked.

use crate::error::ReportError;
use crate::services::reports::engine::ReportEngine;
use actix_web::{web, HttpResponse};
use common::requests::GenerateReportRequest;

pub async fn process(
    payload: web::Json<GenerateReportRequest>,
    engine: web::Data<ReportEngine>,
) -> Result<HttpResponse, ReportError> {
    let request = payload.into_inner();
    let report_id = request
        .report_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ReportError::MissingReportId)?;
    // Absent context means no PII access.
    let permissions = request.permission_context.unwrap_or_default();

    let outcome = engine.generate(&report_id, &permissions).await?;
    Ok(HttpResponse::Ok().json(outcome.into_response()))
}
