//! Predicate builders for standard-branch reads.
//!
//! Every runtime parameter either maps to exactly one predicate or fails the
//! run with `InvalidParameter`. Builders are keyed by the declared type of
//! the field the parameter names; `report_year` is the one parameter that
//! does not name a field and targets the data source's creation date instead.

use crate::error::ReportError;
use crate::services::data_sources::registry::quote_identifier;
use chrono::NaiveDate;
use common::model::datasource::{DataSource, FieldDescriptor};
use common::model::field_type::FieldType;
use common::model::value::{FieldValue, ParamValue};
use std::collections::{BTreeMap, HashMap};

pub const REPORT_YEAR_PARAM: &str = "report_year";

/// A `WHERE` fragment with anonymous `?` slots and the values that fill them.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub clause: String,
    pub values: Vec<FieldValue>,
}

/// Builds a predicate for an already quoted column.
pub type PredicateBuilder = fn(&str, &ParamValue) -> Result<Predicate, String>;

pub struct FilterRegistry {
    builders: HashMap<FieldType, PredicateBuilder>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FilterRegistry {
    pub fn empty() -> Self {
        FilterRegistry {
            builders: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(FieldType::Text, text_equals);
        registry.register(FieldType::Number, number_equals);
        registry.register(FieldType::Boolean, boolean_equals);
        registry.register(FieldType::Date, date_match);
        registry
    }

    pub fn register(&mut self, field_type: FieldType, builder: PredicateBuilder) {
        self.builders.insert(field_type, builder);
    }

    pub fn predicates(
        &self,
        data_source: &DataSource,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<Vec<Predicate>, ReportError> {
        params
            .iter()
            .map(|(name, value)| self.predicate(data_source, name, value))
            .collect()
    }

    fn predicate(
        &self,
        data_source: &DataSource,
        name: &str,
        value: &ParamValue,
    ) -> Result<Predicate, ReportError> {
        if name == REPORT_YEAR_PARAM && data_source.field(name).is_none() {
            let field = year_field(data_source).ok_or_else(|| {
                ReportError::InvalidParameter(format!(
                    "'{}' needs a date field on data source '{}'",
                    REPORT_YEAR_PARAM, data_source.code
                ))
            })?;
            return year_range(&quote_identifier(&field.name), value).map_err(|e| {
                ReportError::InvalidParameter(format!("'{}': {}", REPORT_YEAR_PARAM, e))
            });
        }

        let field = data_source.field(name).ok_or_else(|| {
            ReportError::InvalidParameter(format!(
                "'{}' is not a field of data source '{}'",
                name, data_source.code
            ))
        })?;
        let column = quote_identifier(&field.name);

        if matches!(value, ParamValue::Null) {
            return Ok(Predicate {
                clause: format!("{} IS NULL", column),
                values: Vec::new(),
            });
        }

        let builder = self.builders.get(&field.field_type).ok_or_else(|| {
            ReportError::InvalidParameter(format!(
                "no filter is registered for {:?} field '{}'",
                field.field_type, name
            ))
        })?;
        builder(&column, value)
            .map_err(|e| ReportError::InvalidParameter(format!("'{}': {}", name, e)))
    }
}

/// `created_at` when whitelisted, otherwise the first date field.
fn year_field(data_source: &DataSource) -> Option<&FieldDescriptor> {
    data_source.field("created_at").or_else(|| {
        data_source
            .fields
            .iter()
            .find(|f| f.field_type == FieldType::Date)
    })
}

fn equals(column: &str, value: FieldValue) -> Predicate {
    Predicate {
        clause: format!("{} = ?", column),
        values: vec![value],
    }
}

fn text_equals(column: &str, value: &ParamValue) -> Result<Predicate, String> {
    match value {
        ParamValue::Text(s) => Ok(equals(column, FieldValue::Text(s.clone()))),
        ParamValue::Number(n) => Ok(equals(column, FieldValue::Text(n.to_string()))),
        ParamValue::Null => Err("expected a value".to_string()),
    }
}

fn number_equals(column: &str, value: &ParamValue) -> Result<Predicate, String> {
    match value {
        ParamValue::Number(_) => Ok(equals(column, value.to_field_value())),
        ParamValue::Text(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(equals(column, FieldValue::Integer(i)))
            } else if let Ok(f) = s.parse::<f64>() {
                Ok(equals(column, FieldValue::Real(f)))
            } else {
                Err(format!("expected a number, got {:?}", s))
            }
        }
        ParamValue::Null => Err("expected a number".to_string()),
    }
}

fn boolean_equals(column: &str, value: &ParamValue) -> Result<Predicate, String> {
    let flag = match value {
        ParamValue::Number(n) => match n.as_i64() {
            Some(0) => false,
            Some(1) => true,
            _ => return Err(format!("expected 0 or 1, got {}", n)),
        },
        ParamValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => return Err(format!("expected a boolean, got {:?}", other)),
        },
        ParamValue::Null => return Err("expected a boolean".to_string()),
    };
    Ok(equals(column, FieldValue::Integer(i64::from(flag))))
}

fn date_match(column: &str, value: &ParamValue) -> Result<Predicate, String> {
    if let ParamValue::Text(s) = value {
        let s = s.trim();
        if s.len() == 10 {
            let day = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| format!("expected YYYY-MM-DD, got {:?}", s))?;
            return Ok(Predicate {
                clause: format!("date({}) = ?", column),
                values: vec![FieldValue::Text(day.format("%Y-%m-%d").to_string())],
            });
        }
    }
    year_range(column, value)
}

/// Half-open range `[YYYY-01-01, YYYY+1-01-01)` compared as ISO text.
fn year_range(column: &str, value: &ParamValue) -> Result<Predicate, String> {
    let year = value
        .as_i64()
        .filter(|y| (1..=9998).contains(y))
        .ok_or_else(|| format!("expected a year, got {}", describe(value)))?;
    Ok(Predicate {
        clause: format!("{col} >= ? AND {col} < ?", col = column),
        values: vec![
            FieldValue::Text(format!("{:04}-01-01", year)),
            FieldValue::Text(format!("{:04}-01-01", year + 1)),
        ],
    })
}

fn describe(value: &ParamValue) -> String {
    match value {
        ParamValue::Null => "null".to_string(),
        ParamValue::Number(n) => n.to_string(),
        ParamValue::Text(s) => format!("{:?}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: FieldType) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            label: name.to_string(),
            field_type,
        }
    }

    fn employees() -> DataSource {
        DataSource {
            code: "employees".to_string(),
            base_table: "employees".to_string(),
            fields: vec![
                field("department", FieldType::Text),
                field("grade", FieldType::Number),
                field("active", FieldType::Boolean),
                field("created_at", FieldType::Date),
                field("hired_on", FieldType::Date),
            ],
            joins: vec![],
        }
    }

    fn one(name: &str, value: ParamValue) -> BTreeMap<String, ParamValue> {
        BTreeMap::from([(name.to_string(), value)])
    }

    #[test]
    fn report_year_targets_created_at() {
        let predicates = FilterRegistry::standard()
            .predicates(&employees(), &one("report_year", ParamValue::from(2024)))
            .unwrap();
        assert_eq!(
            predicates,
            vec![Predicate {
                clause: r#""created_at" >= ? AND "created_at" < ?"#.to_string(),
                values: vec![
                    FieldValue::Text("2024-01-01".to_string()),
                    FieldValue::Text("2025-01-01".to_string()),
                ],
            }]
        );
    }

    #[test]
    fn report_year_falls_back_to_first_date_field() {
        let mut ds = employees();
        ds.fields.retain(|f| f.name != "created_at");
        let predicates = FilterRegistry::standard()
            .predicates(&ds, &one("report_year", ParamValue::from("2023")))
            .unwrap();
        assert!(predicates[0].clause.starts_with(r#""hired_on" >= ?"#));
    }

    #[test]
    fn report_year_without_date_field_is_rejected() {
        let mut ds = employees();
        ds.fields.retain(|f| f.field_type != FieldType::Date);
        let err = FilterRegistry::standard()
            .predicates(&ds, &one("report_year", ParamValue::from(2024)))
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidParameter(_)));
    }

    #[test]
    fn field_parameters_use_type_specific_builders() {
        let registry = FilterRegistry::standard();
        let ds = employees();

        let text = registry
            .predicates(&ds, &one("department", ParamValue::from("HR")))
            .unwrap();
        assert_eq!(text[0].clause, r#""department" = ?"#);

        let number = registry
            .predicates(&ds, &one("grade", ParamValue::from("7")))
            .unwrap();
        assert_eq!(number[0].values, vec![FieldValue::Integer(7)]);

        let flag = registry
            .predicates(&ds, &one("active", ParamValue::from("true")))
            .unwrap();
        assert_eq!(flag[0].values, vec![FieldValue::Integer(1)]);

        let day = registry
            .predicates(&ds, &one("hired_on", ParamValue::from("2024-03-01")))
            .unwrap();
        assert_eq!(day[0].clause, r#"date("hired_on") = ?"#);

        let null = registry
            .predicates(&ds, &one("department", ParamValue::Null))
            .unwrap();
        assert_eq!(null[0].clause, r#""department" IS NULL"#);
        assert!(null[0].values.is_empty());
    }

    #[test]
    fn unknown_and_malformed_parameters_are_rejected() {
        let registry = FilterRegistry::standard();
        let ds = employees();
        assert!(registry
            .predicates(&ds, &one("salary", ParamValue::from(1)))
            .is_err());
        assert!(registry
            .predicates(&ds, &one("grade", ParamValue::from("seven")))
            .is_err());
        assert!(registry
            .predicates(&ds, &one("hired_on", ParamValue::from("01/03/2024")))
            .is_err());
    }

    #[test]
    fn missing_builder_is_an_explicit_error() {
        let err = FilterRegistry::empty()
            .predicates(&employees(), &one("grade", ParamValue::from(3)))
            .unwrap_err();
        assert!(err.to_string().contains("no filter is registered"));
    }
}
