use crate::error::ReportError;
use crate::services::reports::render::RenderContext;
use common::model::row::Row;
use common::model::template::{PageSettings, ReportLayout};
use common::model::value::ParamValue;
use common::responses::FieldLabel;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    template: TemplateSummary<'a>,
    labels: Vec<&'a str>,
    fields: &'a [FieldLabel],
    parameters: &'a BTreeMap<String, ParamValue>,
    rows: &'a [Row],
    generated_at: String,
    row_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSummary<'a> {
    id: &'a str,
    name: &'a str,
    data_source: &'a str,
    layout: &'a ReportLayout,
    page_settings: &'a PageSettings,
}

/// Template metadata, labels, parameters, rows, timestamp and row count.
pub fn render_json(ctx: &RenderContext<'_>) -> Result<String, ReportError> {
    let envelope = Envelope {
        template: TemplateSummary {
            id: &ctx.template.id,
            name: &ctx.template.name,
            data_source: &ctx.template.data_source,
            layout: &ctx.template.layout,
            page_settings: &ctx.template.page_settings,
        },
        labels: ctx.fields.iter().map(|f| f.label.as_str()).collect(),
        fields: ctx.fields,
        parameters: ctx.parameters,
        rows: ctx.rows,
        generated_at: ctx.generated_at.to_rfc3339(),
        row_count: ctx.rows.len(),
    };
    serde_json::to_string_pretty(&envelope).map_err(|e| ReportError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::standard_template;
    use chrono::{TimeZone, Utc};
    use common::model::value::FieldValue;

    #[test]
    fn envelope_carries_metadata_rows_and_count() {
        let template = standard_template("t1", "employees");
        let parameters = BTreeMap::from([("report_year".to_string(), ParamValue::from(2024))]);
        let fields = vec![FieldLabel {
            field: "employee_id".into(),
            label: "Employee ID".into(),
        }];
        let rows: Vec<Row> = vec![
            vec![("employee_id".to_string(), FieldValue::from("E1"))].into_iter().collect(),
            vec![("employee_id".to_string(), FieldValue::from("E2"))].into_iter().collect(),
        ];
        let ctx = RenderContext {
            template: &template,
            parameters: &parameters,
            fields: &fields,
            rows: &rows,
            generated_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
        };

        let value: serde_json::Value = serde_json::from_str(&render_json(&ctx).unwrap()).unwrap();
        assert_eq!(value["template"]["name"], template.name.as_str());
        assert_eq!(value["template"]["pageSettings"]["size"], "A4");
        assert_eq!(value["labels"], serde_json::json!(["Employee ID"]));
        assert_eq!(value["parameters"]["report_year"], 2024);
        assert_eq!(value["rows"][1]["employee_id"], "E2");
        assert_eq!(value["rowCount"], 2);
        assert_eq!(value["generatedAt"], "2024-06-01T08:30:00+00:00");
    }
}
