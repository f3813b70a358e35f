use serde::{Deserialize, Serialize};

/// Author-defined description of a report.
///
/// Templates are owned by the admin tooling and are read-only for the
/// duration of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTemplate {
    pub id: String,
    pub name: String,
    /// Code of the `DataSource` this template reads from.
    pub data_source: String,
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Declared output fields, in output order. May be empty.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub layout: ReportLayout,
    #[serde(default)]
    pub page_settings: PageSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLayout {
    #[serde(default)]
    pub bands: Vec<LayoutBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBand {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSettings {
    pub size: PageSize,
    pub orientation: Orientation,
    pub margin_mm: u8,
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl ReportTemplate {
    pub fn has_custom_sql(&self) -> bool {
        self.sql_query
            .as_deref()
            .is_some_and(|sql| !sql.trim().is_empty())
    }

    /// The declared field list, or the fields named by the layout bands when
    /// none is declared. Duplicates keep their first position.
    pub fn declared_fields(&self) -> Vec<String> {
        if !self.fields.is_empty() {
            return self.fields.clone();
        }
        let mut fields: Vec<String> = Vec::new();
        for field in self.layout.bands.iter().flat_map(|b| b.fields.iter()) {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        fields
    }
}
