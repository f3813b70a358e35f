//! Reconciles declared output fields with the columns actually returned.

use common::model::datasource::DataSource;
use common::model::row::Row;
use common::model::template::ReportTemplate;
use common::responses::FieldLabel;

pub struct Projection {
    pub fields: Vec<FieldLabel>,
    pub rows: Vec<Row>,
}

/// Picks the emitted columns and reshapes every row to exactly those columns.
///
/// Column choice, first match wins:
/// 1. declared fields that are present in the first row;
/// 2. every column of the first row, when none of the declared ones is;
/// 3. with no rows, the declared fields, else the data source's field order.
pub fn project(template: &ReportTemplate, data_source: &DataSource, rows: Vec<Row>) -> Projection {
    let declared = template.declared_fields();
    let columns = select_columns(&declared, data_source, rows.first());
    let rows = rows.iter().map(|row| row.project(&columns)).collect();
    let fields = columns
        .into_iter()
        .map(|field| FieldLabel {
            label: label_for(data_source, &field),
            field,
        })
        .collect();
    Projection { fields, rows }
}

pub fn select_columns(
    declared: &[String],
    data_source: &DataSource,
    first: Option<&Row>,
) -> Vec<String> {
    match first {
        Some(row) => {
            let mut present: Vec<String> = Vec::new();
            for field in declared {
                if row.contains(field) && !present.contains(field) {
                    present.push(field.clone());
                }
            }
            if present.is_empty() {
                row.columns().map(String::from).collect()
            } else {
                present
            }
        }
        None if !declared.is_empty() => declared.to_vec(),
        None => data_source.default_field_order(),
    }
}

/// Registered label, else the column name title-cased word by word.
pub fn label_for(data_source: &DataSource, column: &str) -> String {
    match data_source.label_for(column) {
        Some(label) => label.to_string(),
        None => title_case(column),
    }
}

pub fn title_case(column: &str) -> String {
    column
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
