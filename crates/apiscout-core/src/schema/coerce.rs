use serde_json::{Number, Value};

use super::model::SchemaInfo;
use crate::parse::schema::SchemaType;

/// Best-effort conversion of a loosely typed value into the schema's type.
///
/// Values that already have the right type, and values that cannot be
/// converted, are returned unchanged.
pub fn coerce_value(schema: &SchemaInfo, value: &Value) -> Value {
    let Some(target) = schema.primary_type() else {
        return value.clone();
    };
    match (target, value) {
        (SchemaType::String, Value::Number(n)) => Value::String(n.to_string()),
        (SchemaType::String, Value::Bool(b)) => Value::String(b.to_string()),

        (SchemaType::Integer, Value::String(s)) => parse_integer(s.trim())
            .map(Value::from)
            .unwrap_or_else(|| value.clone()),
        (SchemaType::Integer, Value::Number(n)) if !(n.is_i64() || n.is_u64()) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64))
            .unwrap_or_else(|| value.clone()),
        (SchemaType::Integer, Value::Bool(b)) => Value::from(i64::from(*b)),

        (SchemaType::Number, Value::String(s)) => {
            let s = s.trim();
            match parse_integer(s) {
                Some(i) => Value::from(i),
                None => s
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| value.clone()),
            }
        }

        (SchemaType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => value.clone(),
        },
        (SchemaType::Boolean, Value::Number(n)) => match n.as_f64() {
            Some(f) if f == 1.0 => Value::Bool(true),
            Some(f) if f == 0.0 => Value::Bool(false),
            _ => value.clone(),
        },

        (SchemaType::Array, Value::Array(items)) => match item_schema(schema) {
            Some(item) => Value::Array(items.iter().map(|v| coerce_value(item, v)).collect()),
            None => value.clone(),
        },
        (SchemaType::Array, Value::String(s)) => {
            let parts = s.split(',').map(|p| Value::String(p.trim().to_string()));
            match item_schema(schema) {
                Some(item) => Value::Array(parts.map(|v| coerce_value(item, &v)).collect()),
                None => Value::Array(parts.collect()),
            }
        }
        (SchemaType::Array, Value::Number(_) | Value::Bool(_)) => {
            let single = match item_schema(schema) {
                Some(item) => coerce_value(item, value),
                None => value.clone(),
            };
            Value::Array(vec![single])
        }

        (SchemaType::Object, Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => value.clone(),
        },

        _ => value.clone(),
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn item_schema(schema: &SchemaInfo) -> Option<&SchemaInfo> {
    match schema {
        SchemaInfo::Simple(node) => node.items.as_deref(),
        SchemaInfo::AllOf(list) | SchemaInfo::AnyOf(list) | SchemaInfo::OneOf(list) => {
            list.iter().find_map(|s| item_schema(s))
        }
        SchemaInfo::Not(_) => None,
    }
}
