use crate::model::permission::PermissionContext;
use crate::model::report::OutputFormat;
use crate::model::value::ParamValue;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Body of `POST /api/reports/generate`.
///
/// `report_id` is optional at the type level so a missing id can be answered
/// with the documented 400 instead of a deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub permission_context: Option<PermissionContext>,
}

/// Body of `POST /api/reports`: registers a pending report for a template.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub template_id: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub format: OutputFormat,
}
