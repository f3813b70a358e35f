use serde::{Deserialize, Serialize};

/// Entitlements supplied by the caller for a single generation run.
///
/// The engine never derives these itself. Missing flags default to the most
/// conservative value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionContext {
    pub can_view_pii: bool,
    pub is_admin: bool,
    /// Accepted for auditing; filtering by company is the caller's job.
    pub accessible_company_ids: Vec<String>,
}
