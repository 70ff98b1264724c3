use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::model::{Additional, SchemaInfo, SchemaNode, render_values};
use crate::parse::schema::SchemaType;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
static UUID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .ok()
});
static URI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:\S+$").ok());

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Required,
    Type,
    Range,
    Length,
    Pattern,
    Enum,
    Format,
    Items,
    AdditionalProperty,
    Composition,
    UnexpectedBody,
    /// A response status the operation does not declare.
    UndeclaredStatus,
}

/// One failed check at a location inside a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Dotted location (`user.tags[1]`); empty for the root value.
    pub path: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Checks JSON values against a [`SchemaInfo`]. All failures are collected;
/// validation never stops at the first one.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    pub check_required: bool,
    /// Range, length, pattern, enum, format and item-count checks.
    pub check_constraints: bool,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self {
            check_required: true,
            check_constraints: true,
        }
    }
}

impl SchemaValidator {
    pub fn validate(&self, schema: &SchemaInfo, value: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check(schema, value, "", &mut issues);
        issues
    }

    pub fn is_valid(&self, schema: &SchemaInfo, value: &Value) -> bool {
        self.validate(schema, value).is_empty()
    }

    fn check(&self, schema: &SchemaInfo, value: &Value, path: &str, out: &mut Vec<ValidationIssue>) {
        match schema {
            SchemaInfo::Simple(node) => self.check_node(node, value, path, out),
            SchemaInfo::AllOf(parts) => {
                for part in parts {
                    self.check(part, value, path, out);
                }
            }
            SchemaInfo::AnyOf(parts) => {
                if !parts.iter().any(|p| self.is_valid(p, value)) {
                    out.push(ValidationIssue::new(
                        path,
                        IssueKind::Composition,
                        format!("value does not match any of the {} allowed schemas", parts.len()),
                    ));
                }
            }
            SchemaInfo::OneOf(parts) => {
                let matched = parts.iter().filter(|p| self.is_valid(p, value)).count();
                if matched != 1 {
                    out.push(ValidationIssue::new(
                        path,
                        IssueKind::Composition,
                        format!(
                            "value must match exactly one of {} schemas, matched {matched}",
                            parts.len()
                        ),
                    ));
                }
            }
            SchemaInfo::Not(inner) => {
                if self.is_valid(inner, value) {
                    out.push(ValidationIssue::new(
                        path,
                        IssueKind::Composition,
                        "value matches a schema it must not match",
                    ));
                }
            }
        }
    }

    fn check_node(&self, node: &SchemaNode, value: &Value, path: &str, out: &mut Vec<ValidationIssue>) {
        if value.is_null() {
            let allowed = node.nullable
                || matches!(node.schema_type, None | Some(SchemaType::Null))
                || node.enum_values.iter().any(Value::is_null);
            if !allowed {
                out.push(type_issue(path, node.schema_type, value));
            }
            return;
        }

        if let Some(expected) = node.schema_type {
            if !matches_type(expected, value) {
                out.push(type_issue(path, Some(expected), value));
                return;
            }
        }

        if self.check_constraints && !node.enum_values.is_empty() {
            if !node.enum_values.iter().any(|allowed| values_equal(allowed, value)) {
                out.push(ValidationIssue::new(
                    path,
                    IssueKind::Enum,
                    format!("must be one of {}", render_values(&node.enum_values)),
                ));
            }
        }

        match value {
            Value::String(s) if self.check_constraints => self.check_string(node, s, path, out),
            Value::Number(n) if self.check_constraints => {
                if let Some(v) = n.as_f64() {
                    check_number(node, v, path, out);
                }
            }
            Value::Array(items) => self.check_array(node, items, path, out),
            Value::Object(map) => self.check_object(node, map, path, out),
            _ => {}
        }
    }

    fn check_string(&self, node: &SchemaNode, s: &str, path: &str, out: &mut Vec<ValidationIssue>) {
        let len = s.chars().count() as u64;
        if let Some(min) = node.min_length {
            if len < min {
                out.push(ValidationIssue::new(
                    path,
                    IssueKind::Length,
                    format!("must be at least {min} characters long"),
                ));
            }
        }
        if let Some(max) = node.max_length {
            if len > max {
                out.push(ValidationIssue::new(
                    path,
                    IssueKind::Length,
                    format!("must be at most {max} characters long"),
                ));
            }
        }
        if let Some(ref pattern) = node.pattern {
            if !pattern.is_match(s) {
                out.push(ValidationIssue::new(
                    path,
                    IssueKind::Pattern,
                    format!("must match pattern {pattern}"),
                ));
            }
        }
        if let Some(ref format) = node.format {
            if !matches_format(format, s) {
                out.push(ValidationIssue::new(
                    path,
                    IssueKind::Format,
                    format!("must be a valid {format}"),
                ));
            }
        }
    }

    fn check_array(
        &self,
        node: &SchemaNode,
        items: &[Value],
        path: &str,
        out: &mut Vec<ValidationIssue>,
    ) {
        if self.check_constraints {
            let len = items.len() as u64;
            if let Some(min) = node.min_items {
                if len < min {
                    out.push(ValidationIssue::new(
                        path,
                        IssueKind::Items,
                        format!("must contain at least {min} items"),
                    ));
                }
            }
            if let Some(max) = node.max_items {
                if len > max {
                    out.push(ValidationIssue::new(
                        path,
                        IssueKind::Items,
                        format!("must contain at most {max} items"),
                    ));
                }
            }
            if node.unique_items {
                let duplicated = items
                    .iter()
                    .enumerate()
                    .any(|(i, a)| items[..i].iter().any(|b| values_equal(a, b)));
                if duplicated {
                    out.push(ValidationIssue::new(
                        path,
                        IssueKind::Items,
                        "items must be unique",
                    ));
                }
            }
        }
        if let Some(ref item_schema) = node.items {
            for (i, item) in items.iter().enumerate() {
                self.check(item_schema, item, &format!("{path}[{i}]"), out);
            }
        }
    }

    fn check_object(
        &self,
        node: &SchemaNode,
        map: &serde_json::Map<String, Value>,
        path: &str,
        out: &mut Vec<ValidationIssue>,
    ) {
        if self.check_required {
            for name in &node.required {
                if !map.contains_key(name) {
                    out.push(ValidationIssue::new(
                        join(path, name),
                        IssueKind::Required,
                        format!("{name} is required"),
                    ));
                }
            }
        }
        for (key, value) in map {
            let child = join(path, key);
            match node.properties.get(key) {
                Some(prop) => self.check(prop, value, &child, out),
                None => match node.additional_properties {
                    Additional::Allowed => {}
                    Additional::Denied => out.push(ValidationIssue::new(
                        child,
                        IssueKind::AdditionalProperty,
                        format!("additional property {key} is not allowed"),
                    )),
                    Additional::Schema(ref extra) => self.check(extra, value, &child, out),
                },
            }
        }
    }
}

fn check_number(node: &SchemaNode, v: f64, path: &str, out: &mut Vec<ValidationIssue>) {
    if let Some(min) = node.minimum {
        let below = if node.exclusive_minimum { v <= min } else { v < min };
        if below {
            let relation = if node.exclusive_minimum {
                "greater than"
            } else {
                "at least"
            };
            out.push(ValidationIssue::new(
                path,
                IssueKind::Range,
                format!("must be {relation} {min}"),
            ));
        }
    }
    if let Some(max) = node.maximum {
        let above = if node.exclusive_maximum { v >= max } else { v > max };
        if above {
            let relation = if node.exclusive_maximum {
                "less than"
            } else {
                "at most"
            };
            out.push(ValidationIssue::new(
                path,
                IssueKind::Range,
                format!("must be {relation} {max}"),
            ));
        }
    }
    if let Some(step) = node.multiple_of {
        if step > 0.0 && ((v / step).round() * step - v).abs() > f64::EPSILON * v.abs().max(1.0) {
            out.push(ValidationIssue::new(
                path,
                IssueKind::Range,
                format!("must be a multiple of {step}"),
            ));
        }
    }
}

fn type_issue(path: &str, expected: Option<SchemaType>, value: &Value) -> ValidationIssue {
    let expected = expected.map(|t| t.as_str()).unwrap_or("null");
    ValidationIssue::new(
        path,
        IssueKind::Type,
        format!("expected type {expected}, got {}", json_type_name(value)),
    )
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// JSON type name of a value; whole numbers report as `integer`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn matches_type(expected: SchemaType, value: &Value) -> bool {
    match expected {
        SchemaType::String => value.is_string(),
        SchemaType::Number => value.is_number(),
        SchemaType::Integer => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Array => value.is_array(),
        SchemaType::Object => value.is_object(),
        SchemaType::Null => value.is_null(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Unknown formats always match.
fn matches_format(format: &str, s: &str) -> bool {
    let by_regex = |re: &LazyLock<Option<Regex>>| re.as_ref().is_none_or(|r| r.is_match(s));
    match format {
        "email" => by_regex(&EMAIL),
        "uuid" => by_regex(&UUID),
        "uri" | "url" => by_regex(&URI),
        "date" => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "date-time" => DateTime::parse_from_rfc3339(s).is_ok(),
        "ipv4" => s.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => s.parse::<Ipv6Addr>().is_ok(),
        _ => true,
    }
}
