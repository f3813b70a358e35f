use serde::{Deserialize, Serialize};

/// Declared type of a data source field.
///
/// Raw backend values are coerced once against this type before projection,
/// so every later stage works on the closed `FieldValue` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    #[serde(alias = "string", alias = "varchar")]
    Text,
    #[serde(alias = "integer", alias = "numeric", alias = "decimal", alias = "currency")]
    Number,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "datetime", alias = "timestamp")]
    Date,
}
