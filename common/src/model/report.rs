use crate::jobs::ReportStatus;
use crate::model::value::ParamValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The job record tracking one report's latest generation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub id: String,
    pub template_id: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    pub format: OutputFormat,
    pub status: ReportStatus,
    pub row_count: Option<u64>,
    pub file_url: Option<String>,
    pub error_message: Option<String>,
    /// Number of terminal writes so far. Grows by one per finished run.
    pub run_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GeneratedReport {
    pub fn pending(
        id: impl Into<String>,
        template_id: impl Into<String>,
        parameters: BTreeMap<String, ParamValue>,
        format: OutputFormat,
    ) -> Self {
        let now = Utc::now();
        GeneratedReport {
            id: id.into(),
            template_id: template_id.into(),
            parameters,
            format,
            status: ReportStatus::Pending,
            row_count: None,
            file_url: None,
            error_message: None,
            run_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Pdf,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "pdf" => Some(OutputFormat::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Json => "application/json",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}
