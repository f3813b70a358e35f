//! Field-level PII redaction.
//!
//! A column is sensitive when its lower-cased name contains any dictionary
//! keyword. Unless the caller may view PII, every non-null value in a
//! sensitive column is replaced by the redaction marker. Row count and column
//! set never change, and masking masked output is a no-op.

use common::model::permission::PermissionContext;
use common::model::row::Row;
use common::model::value::FieldValue;
use common::responses::FieldLabel;
use rayon::prelude::*;

pub const REDACTION_MARKER: &str = "***MASKED***";

pub const PII_KEYWORDS: &[&str] = &[
    "email",
    "phone",
    "mobile",
    "address",
    "ssn",
    "social_security",
    "national_id",
    "government_id",
    "passport",
    "tax_id",
    "driver_license",
    "bank",
    "account_number",
    "routing",
    "iban",
    "swift",
    "date_of_birth",
    "birth_date",
    "dob",
    "emergency_contact",
];

pub struct PiiPolicy {
    keywords: Vec<String>,
}

impl Default for PiiPolicy {
    fn default() -> Self {
        PiiPolicy::new(PII_KEYWORDS.iter().copied())
    }
}

impl PiiPolicy {
    pub fn new<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        PiiPolicy {
            keywords: keywords.into_iter().map(str::to_lowercase).collect(),
        }
    }

    pub fn is_sensitive(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        self.keywords.iter().any(|k| column.contains(k.as_str()))
    }

    pub fn sensitive_columns(&self, fields: &[FieldLabel]) -> Vec<String> {
        fields
            .iter()
            .filter(|f| self.is_sensitive(&f.field))
            .map(|f| f.field.clone())
            .collect()
    }

    /// Masks `rows` in place and returns the number of values replaced.
    pub fn apply(
        &self,
        permissions: &PermissionContext,
        fields: &[FieldLabel],
        rows: &mut [Row],
    ) -> usize {
        if permissions.can_view_pii {
            return 0;
        }
        let columns = self.sensitive_columns(fields);
        if columns.is_empty() {
            return 0;
        }
        rows.par_iter_mut()
            .map(|row| mask_row(row, &columns))
            .sum()
    }
}

fn mask_row(row: &mut Row, columns: &[String]) -> usize {
    let mut masked = 0;
    for column in columns {
        if let Some(value) = row.get_mut(column) {
            if !value.is_null() {
                *value = FieldValue::Text(REDACTION_MARKER.to_string());
                masked += 1;
            }
        }
    }
    masked
}
