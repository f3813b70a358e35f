use crate::model::report::{GeneratedReport, OutputFormat};
use crate::model::row::Row;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLabel {
    pub field: String,
    pub label: String,
}

/// Success body of `POST /api/reports/generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportResponse {
    pub success: bool,
    pub report_id: String,
    pub row_count: u64,
    pub file_url: Option<String>,
    pub data: Vec<Row>,
    pub field_labels: Vec<FieldLabel>,
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /api/reports`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportResponse {
    pub report_id: String,
}

/// Body of `GET /api/reports/{id}`: the stored record plus live run state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusResponse {
    #[serde(flatten)]
    pub report: GeneratedReport,
    /// Runs for this report executing right now.
    pub in_flight: usize,
}
