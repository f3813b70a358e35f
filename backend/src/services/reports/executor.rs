//! Query planning and execution.
//!
//! Exactly one branch runs per generation:
//! - custom SQL, when the template carries a non-empty SQL body; the body is
//!   bound with the run's parameters and sent as-is;
//! - standard, otherwise; a capped read of the data source's whitelisted
//!   columns, filtered through the `FilterRegistry`.
//!
//! Both go through `QueryBackend::execute`, which wraps the statement in a
//! subquery and returns ordered rows.

use crate::config::ParamBinding;
use crate::db::SqliteDb;
use crate::error::ReportError;
use crate::services::data_sources::registry::{quote_identifier, quoted_table};
use crate::services::reports::binder::{bind, BoundQuery};
use crate::services::reports::filters::FilterRegistry;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use common::model::datasource::DataSource;
use common::model::field_type::FieldType;
use common::model::row::Row;
use common::model::template::ReportTemplate;
use common::model::value::{FieldValue, ParamValue};
use rusqlite::params_from_iter;
use rusqlite::types::{Value, ValueRef};
use std::collections::BTreeMap;

/// The generic "run this SQL and give me rows" surface.
pub trait QueryBackend: Send + Sync {
    /// Errors carry the backend's own message, unmodified.
    fn execute(&self, query: &BoundQuery) -> Result<Vec<Row>, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    CustomSql,
    Standard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub branch: Branch,
    pub query: BoundQuery,
}

pub fn plan_query(
    template: &ReportTemplate,
    data_source: &DataSource,
    params: &BTreeMap<String, ParamValue>,
    binding: ParamBinding,
    row_limit: usize,
    filters: &FilterRegistry,
) -> Result<QueryPlan, ReportError> {
    match template.sql_query.as_deref() {
        Some(sql) if template.has_custom_sql() => Ok(QueryPlan {
            branch: Branch::CustomSql,
            query: bind(sql, params, binding),
        }),
        _ => Ok(QueryPlan {
            branch: Branch::Standard,
            query: standard_query(data_source, params, row_limit, filters)?,
        }),
    }
}

/// Bounded read of the base table. Selects the whitelisted columns, or every
/// column when the data source declares none.
pub fn standard_query(
    data_source: &DataSource,
    params: &BTreeMap<String, ParamValue>,
    row_limit: usize,
    filters: &FilterRegistry,
) -> Result<BoundQuery, ReportError> {
    let table = quoted_table(&data_source.base_table)?;
    let columns = if data_source.fields.is_empty() {
        "*".to_string()
    } else {
        data_source
            .fields
            .iter()
            .map(|f| quote_identifier(&f.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let predicates = filters.predicates(data_source, params)?;
    let mut sql = format!("SELECT {} FROM {}", columns, table);
    let mut values = Vec::new();
    if !predicates.is_empty() {
        let clauses: Vec<&str> = predicates.iter().map(|p| p.clause.as_str()).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        for predicate in predicates {
            values.extend(predicate.values);
        }
    }
    sql.push_str(&format!(" LIMIT {}", row_limit));

    Ok(BoundQuery::new(sql, values))
}

impl QueryBackend for SqliteDb {
    fn execute(&self, query: &BoundQuery) -> Result<Vec<Row>, String> {
        let conn = self.open().map_err(|e| e.to_string())?;
        // Newlines keep a trailing `--` comment inside the subquery.
        let wrapped = format!("SELECT * FROM (\n{}\n) AS report_rows", query.sql);
        let mut stmt = conn.prepare(&wrapped).map_err(|e| e.to_string())?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let values: Vec<Value> = query.params.iter().map(to_sql_value).collect();
        let mut rows = stmt
            .query(params_from_iter(values.iter()))
            .map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let mut record = Row::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let value = row.get_ref(i).map_err(|e| e.to_string())?;
                record.set(column.clone(), from_value_ref(value));
            }
            out.push(record);
        }
        Ok(out)
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Real(r) => Value::Real(*r),
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => FieldValue::Integer(i),
        ValueRef::Real(r) => FieldValue::Real(r),
        ValueRef::Text(bytes) => FieldValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => FieldValue::Text(BASE64.encode(bytes)),
    }
}

/// Applies the data source's declared field types to raw backend values.
/// Columns the data source does not describe are left as returned.
pub fn coerce_rows(mut rows: Vec<Row>, data_source: &DataSource) -> Vec<Row> {
    if data_source.fields.is_empty() {
        return rows;
    }
    for row in &mut rows {
        for (column, value) in row.iter_mut() {
            if let Some(field) = data_source.field(column) {
                let raw = std::mem::replace(value, FieldValue::Null);
                *value = coerce(raw, field.field_type);
            }
        }
    }
    rows
}

fn coerce(value: FieldValue, field_type: FieldType) -> FieldValue {
    match (field_type, value) {
        (FieldType::Boolean, FieldValue::Integer(i)) if i == 0 || i == 1 => {
            FieldValue::Bool(i == 1)
        }
        (FieldType::Boolean, FieldValue::Text(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            _ => FieldValue::Text(s),
        },
        (FieldType::Date, FieldValue::Text(s)) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(date) => FieldValue::Date(date),
            Err(_) => FieldValue::Text(s),
        },
        (FieldType::Number, FieldValue::Text(s)) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                FieldValue::Integer(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                FieldValue::Real(f)
            } else {
                FieldValue::Text(s)
            }
        }
        (_, value) => value,
    }
}
