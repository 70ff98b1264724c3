use serde_json::{Map, Number, Value, json};

use super::model::{SchemaInfo, SchemaNode};
use crate::parse::schema::SchemaType;

/// Nesting depth past which generated examples stop recursing.
const MAX_DEPTH: usize = 8;

/// Produce a plausible value for a schema.
///
/// Preference order: declared example, default, first enum value, then a
/// synthetic value driven by type and format.
pub fn example_value(schema: &SchemaInfo) -> Value {
    example_at(schema, 0)
}

fn example_at(schema: &SchemaInfo, depth: usize) -> Value {
    match schema {
        SchemaInfo::Simple(node) => node_example(node, depth),
        SchemaInfo::AllOf(parts) => {
            let mut merged = Map::new();
            let mut fallback = Value::Null;
            for part in parts {
                match example_at(part, depth) {
                    Value::Object(obj) => merged.extend(obj),
                    Value::Null => {}
                    other => fallback = other,
                }
            }
            if merged.is_empty() {
                fallback
            } else {
                Value::Object(merged)
            }
        }
        SchemaInfo::AnyOf(parts) | SchemaInfo::OneOf(parts) => parts
            .first()
            .map(|p| example_at(p, depth))
            .unwrap_or(Value::Null),
        SchemaInfo::Not(_) => Value::Null,
    }
}

fn node_example(node: &SchemaNode, depth: usize) -> Value {
    if let Some(ref example) = node.example {
        return example.clone();
    }
    if let Some(ref default) = node.default {
        return default.clone();
    }
    if let Some(first) = node.enum_values.first() {
        return first.clone();
    }
    if depth >= MAX_DEPTH {
        return Value::Null;
    }

    match node.schema_type {
        Some(SchemaType::String) => Value::String(string_example(node.format.as_deref())),
        Some(SchemaType::Integer) => {
            // `as` saturates, so a huge minimum lands on i64::MAX.
            let base = node.minimum.map(|m| m.ceil() as i64).unwrap_or(1);
            let value = match node.minimum {
                Some(m) if node.exclusive_minimum && m.ceil() == m => base.saturating_add(1),
                _ => base,
            };
            json!(value)
        }
        Some(SchemaType::Number) => {
            let value = node.minimum.unwrap_or(1.0);
            Number::from_f64(value).map(Value::Number).unwrap_or(json!(1.0))
        }
        Some(SchemaType::Boolean) => Value::Bool(true),
        Some(SchemaType::Array) => match node.items {
            Some(ref items) => Value::Array(vec![example_at(items, depth + 1)]),
            None => Value::Array(Vec::new()),
        },
        Some(SchemaType::Object) => {
            let obj: Map<String, Value> = node
                .properties
                .iter()
                .map(|(name, prop)| (name.clone(), example_at(prop, depth + 1)))
                .collect();
            Value::Object(obj)
        }
        Some(SchemaType::Null) | None => Value::Null,
    }
}

fn string_example(format: Option<&str>) -> String {
    match format {
        Some("email") => "user@example.com",
        Some("date") => "2023-01-01",
        Some("date-time") => "2023-01-01T12:00:00Z",
        Some("uuid") => "123e4567-e89b-12d3-a456-426614174000",
        Some("uri") | Some("url") => "https://example.com",
        Some("ipv4") => "192.0.2.1",
        _ => "example",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;

    use super::*;

    fn node(t: SchemaType) -> SchemaNode {
        SchemaNode {
            schema_type: Some(t),
            ..SchemaNode::default()
        }
    }

    #[test]
    fn prefers_example_then_default_then_enum() {
        let mut n = node(SchemaType::String);
        n.enum_values = vec![json!("red"), json!("blue")];
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!("red"));
        n.default = Some(json!("blue"));
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!("blue"));
        n.example = Some(json!("green"));
        assert_eq!(example_value(&SchemaInfo::Simple(n)), json!("green"));
    }

    #[test]
    fn formats_get_realistic_strings() {
        let mut n = node(SchemaType::String);
        n.format = Some("email".to_string());
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!("user@example.com"));
        n.format = Some("date-time".to_string());
        assert_eq!(
            example_value(&SchemaInfo::Simple(n)),
            json!("2023-01-01T12:00:00Z")
        );
    }

    #[test]
    fn numbers_honor_minimum() {
        let mut n = node(SchemaType::Integer);
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!(1));
        n.minimum = Some(10.0);
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!(10));
        n.exclusive_minimum = true;
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!(11));
        n.minimum = Some(2.5);
        assert_eq!(example_value(&SchemaInfo::Simple(n)), json!(3));
    }

    #[test]
    fn huge_exclusive_minimum_saturates() {
        let mut n = node(SchemaType::Integer);
        n.minimum = Some(i64::MAX as f64);
        n.exclusive_minimum = true;
        assert_eq!(example_value(&SchemaInfo::Simple(n.clone())), json!(i64::MAX));
        n.minimum = Some(1e300);
        assert_eq!(example_value(&SchemaInfo::Simple(n)), json!(i64::MAX));
    }

    #[test]
    fn objects_and_arrays_recurse() {
        let mut props = IndexMap::new();
        props.insert("name".to_string(), Arc::new(SchemaInfo::of_type(SchemaType::String)));
        props.insert(
            "tags".to_string(),
            Arc::new(SchemaInfo::Simple(SchemaNode {
                schema_type: Some(SchemaType::Array),
                items: Some(Arc::new(SchemaInfo::of_type(SchemaType::Boolean))),
                ..SchemaNode::default()
            })),
        );
        let obj = SchemaInfo::Simple(SchemaNode {
            schema_type: Some(SchemaType::Object),
            properties: props,
            ..SchemaNode::default()
        });
        assert_eq!(
            example_value(&obj),
            json!({"name": "example", "tags": [true]})
        );
    }
}
