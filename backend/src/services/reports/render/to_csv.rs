use crate::error::ReportError;
use common::model::row::Row;
use common::model::value::FieldValue;
use common::responses::FieldLabel;

/// Header of labels, then one record per row in field order. Values holding
/// a comma, double quote or line break are quoted with inner quotes doubled;
/// null becomes an empty field.
pub fn render_csv(fields: &[FieldLabel], rows: &[Row]) -> Result<String, ReportError> {
    if fields.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let render_err = |e: csv::Error| ReportError::Render(e.to_string());

    writer
        .write_record(fields.iter().map(|f| f.label.as_str()))
        .map_err(render_err)?;
    for row in rows {
        writer
            .write_record(
                fields
                    .iter()
                    .map(|f| row.get(&f.field).and_then(FieldValue::to_text).unwrap_or_default()),
            )
            .map_err(render_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<FieldLabel> {
        vec![
            FieldLabel {
                field: "employee_id".into(),
                label: "Employee ID".into(),
            },
            FieldLabel {
                field: "note".into(),
                label: "Note".into(),
            },
        ]
    }

    #[test]
    fn header_is_labels_and_nulls_are_empty() {
        let rows: Vec<Row> = vec![vec![
            ("employee_id".to_string(), FieldValue::Integer(7)),
            ("note".to_string(), FieldValue::Null),
        ]
        .into_iter()
        .collect()];
        assert_eq!(render_csv(&labels(), &rows).unwrap(), "Employee ID,Note\n7,\n");
    }

    #[test]
    fn awkward_values_survive_a_parse() {
        let tricky = "a,b\"c\nd";
        let rows: Vec<Row> = vec![vec![
            ("employee_id".to_string(), FieldValue::from("E1")),
            ("note".to_string(), FieldValue::from(tricky)),
        ]
        .into_iter()
        .collect()];
        let rendered = render_csv(&labels(), &rows).unwrap();
        assert!(rendered.contains("\"a,b\"\"c\nd\""));

        let mut reader = csv::Reader::from_reader(rendered.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], tricky);
    }

    #[test]
    fn no_fields_render_nothing() {
        assert_eq!(render_csv(&[], &[]).unwrap(), "");
    }
}
