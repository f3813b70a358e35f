//! Placeholder substitution for custom SQL templates.
//!
//! Two placeholder syntaxes are recognised for every bound parameter:
//! `{{name}}` (whitespace inside the braces is ignored) and `:name`. The
//! template is scanned once from left to right, so text produced by a
//! substitution is never scanned again. Placeholders without a matching
//! parameter are left as they are and fail later, at execution time.

use crate::config::ParamBinding;
use common::model::value::{FieldValue, ParamValue};
use std::collections::BTreeMap;

/// SQL text plus the positional values it references.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl BoundQuery {
    pub fn new(sql: impl Into<String>, params: Vec<FieldValue>) -> Self {
        BoundQuery {
            sql: sql.into(),
            params,
        }
    }
}

pub fn bind(sql: &str, params: &BTreeMap<String, ParamValue>, mode: ParamBinding) -> BoundQuery {
    match mode {
        ParamBinding::Parameterized => bind_parameterized(sql, params),
        ParamBinding::Inline => BoundQuery::new(bind_inline(sql, params), Vec::new()),
    }
}

/// Replaces placeholders with SQL literals: strings single-quoted with
/// embedded quotes doubled, numbers verbatim, null as `NULL`.
pub fn bind_inline(sql: &str, params: &BTreeMap<String, ParamValue>) -> String {
    let bound = substitute(sql, params, |_, value| literal(value));
    strip_trailing_terminator(&bound).to_string()
}

/// Binds text values as numbered driver parameters (`?N`, by first appearance,
/// shared by both syntaxes of one name). Numbers and null are inlined as in
/// `bind_inline`, so `ORDER BY {{col}}` stays a column ordinal.
pub fn bind_parameterized(sql: &str, params: &BTreeMap<String, ParamValue>) -> BoundQuery {
    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<FieldValue> = Vec::new();
    let bound = substitute(sql, params, |name, value| {
        if !matches!(value, ParamValue::Text(_)) {
            return literal(value);
        }
        let index = match names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                names.push(name.to_string());
                values.push(value.to_field_value());
                names.len() - 1
            }
        };
        format!("?{}", index + 1)
    });
    BoundQuery::new(strip_trailing_terminator(&bound), values)
}

/// Drops one trailing `;` (and surrounding trailing whitespace). The
/// execution surface wraps the statement in a subquery, where a terminator
/// is a syntax error.
pub fn strip_trailing_terminator(sql: &str) -> &str {
    let trimmed = sql.trim_end();
    trimmed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(trimmed)
}

fn literal(value: &ParamValue) -> String {
    match value {
        ParamValue::Null => "NULL".to_string(),
        ParamValue::Number(n) => n.to_string(),
        ParamValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

fn substitute<F>(sql: &str, params: &BTreeMap<String, ParamValue>, mut render: F) -> String
where
    F: FnMut(&str, &ParamValue) -> String,
{
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("{{") {
            if let Some(end) = rest[2..].find("}}") {
                let name = rest[2..2 + end].trim();
                if let Some(value) = params.get(name) {
                    out.push_str(&render(name, value));
                    rest = &rest[2 + end + 2..];
                    continue;
                }
            }
        } else if c == ':' && !out.ends_with(':') && !rest[1..].starts_with(':') {
            let len = identifier_len(&rest[1..]);
            if len > 0 {
                let name = &rest[1..1 + len];
                if let Some(value) = params.get(name) {
                    out.push_str(&render(name, value));
                    rest = &rest[1 + len..];
                    continue;
                }
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Length of the identifier at the start of `s`, or 0 when there is none.
fn identifier_len(s: &str) -> usize {
    match s.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    s.char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(s.len(), |(i, _)| i)
}
