//! Error taxonomy of the report engine and its HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::responses::ErrorResponse;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report ID is required")]
    MissingReportId,

    #[error("Report not found")]
    ReportNotFound(String),

    #[error("Report template not found")]
    TemplateNotFound(String),

    #[error("Data source not found")]
    DataSourceNotFound(String),

    #[error("Invalid data source: {0}")]
    InvalidDataSource(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    BadRequest(String),

    /// Carries the backend's message verbatim.
    #[error("SQL execution failed: {0}")]
    SqlExecution(String),

    #[error("SQL execution failed: execution exceeded the {}s deadline", .0.as_secs_f64())]
    ExecutionTimeout(Duration),

    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("Report store error: {0}")]
    Store(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<rusqlite::Error> for ReportError {
    fn from(err: rusqlite::Error) -> Self {
        ReportError::Store(err.to_string())
    }
}

impl ResponseError for ReportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReportError::MissingReportId
            | ReportError::DataSourceNotFound(_)
            | ReportError::InvalidDataSource(_)
            | ReportError::InvalidParameter(_)
            | ReportError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ReportError::ReportNotFound(_) | ReportError::TemplateNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ReportError::SqlExecution(_)
            | ReportError::ExecutionTimeout(_)
            | ReportError::Render(_)
            | ReportError::Store(_)
            | ReportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
