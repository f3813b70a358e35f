use crate::model::field_type::FieldType;
use serde::{Deserialize, Serialize};

/// A registry entry mapping a logical code to a physical table and the
/// whitelist of fields that may be selected from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub code: String,
    pub base_table: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub joins: Vec<JoinDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

/// Join metadata kept for authoring tools. The executor only uses the base table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDescriptor {
    pub table: String,
    pub on: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl DataSource {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn label_for(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.label.as_str())
    }

    /// Field names in registry order.
    pub fn default_field_order(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}
