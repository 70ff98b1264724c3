use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::model::{Additional, Pattern, SchemaInfo, SchemaNode};
use crate::parse::schema::{
    AdditionalProperties, ExclusiveBound, Schema, SchemaOrRef, SchemaType, TypeSet,
};

impl SchemaInfo {
    /// Convert a resolved schema. Leftover `$ref` nodes (cycles, dangling
    /// pointers) become accept-anything schemas.
    pub fn from_schema_or_ref(schema: &SchemaOrRef) -> Self {
        SchemaConverter::new().convert(schema)
    }

    pub fn from_schema(schema: &Schema) -> Self {
        SchemaConverter::new().convert_schema(schema)
    }
}

/// Lowers parsed schemas into [`SchemaInfo`], converting each shared
/// schema allocation once.
///
/// The reference resolver hands out one `Arc<Schema>` per component, so
/// every use of a component maps to the same `Arc<SchemaInfo>`.
#[derive(Debug, Default)]
pub struct SchemaConverter {
    // Holding the source keeps its address from being reused.
    seen: HashMap<*const Schema, (Arc<Schema>, Arc<SchemaInfo>)>,
}

impl SchemaConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct schema allocations converted so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn shared(&mut self, schema: &SchemaOrRef) -> Arc<SchemaInfo> {
        match schema {
            SchemaOrRef::Ref { .. } => Arc::new(SchemaInfo::any()),
            SchemaOrRef::Schema(s) => {
                let key = Arc::as_ptr(s);
                if let Some((_, info)) = self.seen.get(&key) {
                    return Arc::clone(info);
                }
                let info = Arc::new(self.convert_schema(s));
                self.seen.insert(key, (Arc::clone(s), Arc::clone(&info)));
                info
            }
        }
    }

    pub fn convert(&mut self, schema: &SchemaOrRef) -> SchemaInfo {
        SchemaInfo::clone(&self.shared(schema))
    }

    pub fn convert_schema(&mut self, schema: &Schema) -> SchemaInfo {
        let node = self.convert_node(schema);
        let has_own = node != SchemaNode::default() && !is_annotation_only(&node);

        let mut parts = Vec::new();
        if !schema.all_of.is_empty() {
            parts.extend(schema.all_of.iter().map(|s| self.shared(s)));
        }
        if !schema.any_of.is_empty() {
            parts.push(Arc::new(SchemaInfo::AnyOf(self.shared_list(&schema.any_of))));
        }
        if !schema.one_of.is_empty() {
            parts.push(Arc::new(SchemaInfo::OneOf(self.shared_list(&schema.one_of))));
        }
        if let Some(ref not) = schema.not {
            parts.push(Arc::new(SchemaInfo::Not(self.shared(not))));
        }

        match parts.len() {
            0 => SchemaInfo::Simple(node),
            1 if !has_own && schema.all_of.is_empty() => SchemaInfo::clone(&parts[0]),
            _ => {
                if has_own {
                    parts.insert(0, Arc::new(SchemaInfo::Simple(node)));
                }
                SchemaInfo::AllOf(parts)
            }
        }
    }

    fn shared_list(&mut self, list: &[SchemaOrRef]) -> Vec<Arc<SchemaInfo>> {
        list.iter().map(|s| self.shared(s)).collect()
    }

    fn convert_node(&mut self, schema: &Schema) -> SchemaNode {
        let (declared, nullable_from_type) = match schema.schema_type {
            Some(TypeSet::Single(t)) => (Some(t), false),
            Some(TypeSet::Multiple(ref types)) => {
                let first = types.iter().copied().find(|t| *t != SchemaType::Null);
                let has_null = types.contains(&SchemaType::Null);
                (first.or(has_null.then_some(SchemaType::Null)), has_null)
            }
            None => (None, false),
        };

        let mut enum_values = schema.enum_values.clone();
        if enum_values.is_empty() {
            if let Some(ref c) = schema.const_value {
                enum_values.push(c.clone());
            }
        }

        let schema_type = declared.or_else(|| infer_type(schema, &enum_values));

        let (minimum, exclusive_minimum) = lower_bound(schema.minimum, schema.exclusive_minimum);
        let (maximum, exclusive_maximum) = upper_bound(schema.maximum, schema.exclusive_maximum);

        let additional_properties = match schema.additional_properties {
            None | Some(AdditionalProperties::Bool(true)) => Additional::Allowed,
            Some(AdditionalProperties::Bool(false)) => Additional::Denied,
            Some(AdditionalProperties::Schema(ref s)) => Additional::Schema(self.shared(s)),
        };

        SchemaNode {
            schema_type,
            nullable: schema.nullable.unwrap_or(false) || nullable_from_type,
            format: schema.format.clone(),
            description: schema.description.clone().or_else(|| schema.title.clone()),
            enum_values,
            default: schema.default_value.clone(),
            example: schema.example.clone(),
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of: schema.multiple_of,
            min_length: schema.min_length,
            max_length: schema.max_length,
            pattern: schema.pattern.as_deref().map(Pattern::new),
            items: schema.items.as_ref().map(|i| self.shared(i)),
            min_items: schema.min_items,
            max_items: schema.max_items,
            unique_items: schema.unique_items.unwrap_or(false),
            properties: schema
                .properties
                .iter()
                .map(|(name, prop)| (name.clone(), self.shared(prop)))
                .collect(),
            required: schema.required.clone(),
            additional_properties,
            read_only: schema.read_only.unwrap_or(false),
            write_only: schema.write_only.unwrap_or(false),
        }
    }
}

/// Nodes carrying only a description or title add nothing to composition.
fn is_annotation_only(node: &SchemaNode) -> bool {
    let stripped = SchemaNode {
        description: None,
        ..node.clone()
    };
    stripped == SchemaNode::default()
}

/// Normalise 3.0 boolean and 3.1 numeric exclusive minimums into
/// `(bound, exclusive)`. When both an inclusive and a numeric exclusive
/// bound are declared, the stricter one wins.
fn lower_bound(inclusive: Option<f64>, exclusive: Option<ExclusiveBound>) -> (Option<f64>, bool) {
    match exclusive {
        Some(ExclusiveBound::Value(e)) => match inclusive {
            Some(m) if m > e => (Some(m), false),
            _ => (Some(e), true),
        },
        Some(ExclusiveBound::Flag(flag)) => (inclusive, flag && inclusive.is_some()),
        None => (inclusive, false),
    }
}

/// Mirror of [`lower_bound`] for maximums.
fn upper_bound(inclusive: Option<f64>, exclusive: Option<ExclusiveBound>) -> (Option<f64>, bool) {
    match exclusive {
        Some(ExclusiveBound::Value(e)) => match inclusive {
            Some(m) if m < e => (Some(m), false),
            _ => (Some(e), true),
        },
        Some(ExclusiveBound::Flag(flag)) => (inclusive, flag && inclusive.is_some()),
        None => (inclusive, false),
    }
}

/// Infer a missing `type` from structure, format, or the first enum value.
fn infer_type(schema: &Schema, enum_values: &[Value]) -> Option<SchemaType> {
    if !schema.properties.is_empty() || schema.additional_properties.is_some() {
        return Some(SchemaType::Object);
    }
    if schema.items.is_some() {
        return Some(SchemaType::Array);
    }
    if let Some(ref format) = schema.format {
        let inferred = match format.as_str() {
            "int32" | "int64" => Some(SchemaType::Integer),
            "float" | "double" => Some(SchemaType::Number),
            "email" | "uri" | "url" | "uuid" | "date" | "date-time" | "time" | "hostname"
            | "ipv4" | "ipv6" | "byte" | "binary" | "password" => Some(SchemaType::String),
            _ => None,
        };
        if inferred.is_some() {
            return inferred;
        }
    }
    match enum_values.first()? {
        Value::String(_) => Some(SchemaType::String),
        Value::Bool(_) => Some(SchemaType::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(SchemaType::Integer),
        Value::Number(_) => Some(SchemaType::Number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::schema::Schema;
    use crate::schema::{IssueKind, SchemaValidator};

    fn parse(json: &str) -> Schema {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn infers_type_from_format_and_enum() {
        let s = SchemaInfo::from_schema(&parse(r#"{"format": "int64"}"#));
        assert_eq!(s.primary_type(), Some(SchemaType::Integer));

        let s = SchemaInfo::from_schema(&parse(r#"{"format": "email"}"#));
        assert_eq!(s.primary_type(), Some(SchemaType::String));

        let s = SchemaInfo::from_schema(&parse(r#"{"enum": [true, false]}"#));
        assert_eq!(s.primary_type(), Some(SchemaType::Boolean));
    }

    #[test]
    fn type_list_with_null_is_nullable() {
        let s = SchemaInfo::from_schema(&parse(r#"{"type": ["string", "null"]}"#));
        let node = s.as_node().unwrap();
        assert_eq!(node.schema_type, Some(SchemaType::String));
        assert!(node.nullable);
    }

    #[test]
    fn numeric_exclusive_bounds_are_normalised() {
        let s = SchemaInfo::from_schema(&parse(r#"{"type": "number", "exclusiveMinimum": 0}"#));
        let node = s.as_node().unwrap();
        assert_eq!(node.minimum, Some(0.0));
        assert!(node.exclusive_minimum);

        let s = SchemaInfo::from_schema(&parse(
            r#"{"type": "number", "maximum": 5, "exclusiveMaximum": true}"#,
        ));
        let node = s.as_node().unwrap();
        assert_eq!(node.maximum, Some(5.0));
        assert!(node.exclusive_maximum);
    }

    #[test]
    fn composition_becomes_tagged_variant() {
        let s = SchemaInfo::from_schema(&parse(
            r#"{"oneOf": [{"type": "string"}, {"type": "integer"}]}"#,
        ));
        assert!(matches!(s, SchemaInfo::OneOf(ref v) if v.len() == 2));

        let s = SchemaInfo::from_schema(&parse(
            r#"{"allOf": [{"type": "object", "required": ["a"]}, {"required": ["b"]}]}"#,
        ));
        assert!(matches!(s, SchemaInfo::AllOf(ref v) if v.len() == 2));

        let s = SchemaInfo::from_schema(&parse(r#"{"type": "string", "not": {"enum": ["x"]}}"#));
        let SchemaInfo::AllOf(parts) = s else {
            panic!("own constraints plus not should combine");
        };
        assert!(matches!(*parts[1], SchemaInfo::Not(_)));
    }

    #[test]
    fn dangling_reference_is_unconstrained() {
        let s = SchemaInfo::from_schema_or_ref(&SchemaOrRef::Ref {
            ref_path: "#/components/schemas/Missing".to_string(),
        });
        assert_eq!(s, SchemaInfo::any());
    }

    #[test]
    fn stricter_of_inclusive_and_exclusive_bounds_wins() {
        let s = SchemaInfo::from_schema(&parse(
            r#"{"type": "integer", "minimum": 5, "exclusiveMinimum": 0}"#,
        ));
        let node = s.as_node().unwrap();
        assert_eq!((node.minimum, node.exclusive_minimum), (Some(5.0), false));
        let issues = SchemaValidator::default().validate(&s, &serde_json::json!(3));
        assert_eq!(issues.iter().map(|i| i.kind).collect::<Vec<_>>(), vec![IssueKind::Range]);
        assert!(SchemaValidator::default().is_valid(&s, &serde_json::json!(5)));

        let s = SchemaInfo::from_schema(&parse(
            r#"{"type": "integer", "minimum": 5, "exclusiveMinimum": 5}"#,
        ));
        let node = s.as_node().unwrap();
        assert_eq!((node.minimum, node.exclusive_minimum), (Some(5.0), true));

        let s = SchemaInfo::from_schema(&parse(
            r#"{"type": "integer", "maximum": 10, "exclusiveMaximum": 50}"#,
        ));
        let node = s.as_node().unwrap();
        assert_eq!((node.maximum, node.exclusive_maximum), (Some(10.0), false));

        let s = SchemaInfo::from_schema(&parse(
            r#"{"type": "integer", "maximum": 10, "exclusiveMaximum": 8}"#,
        ));
        let node = s.as_node().unwrap();
        assert_eq!((node.maximum, node.exclusive_maximum), (Some(8.0), true));
    }

    #[test]
    fn shared_schemas_convert_once() {
        let id = SchemaOrRef::Schema(Arc::new(parse(r#"{"type": "string", "pattern": "^u"}"#)));
        let object = Schema {
            properties: [("owner", id.clone()), ("creator", id.clone())]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..parse(r#"{"type": "object"}"#)
        };

        let mut converter = SchemaConverter::new();
        let info = converter.convert_schema(&object);
        let node = info.as_node().unwrap();
        assert!(Arc::ptr_eq(&node.properties["owner"], &node.properties["creator"]));
        assert_eq!(converter.len(), 1);

        let again = converter.shared(&id);
        assert!(Arc::ptr_eq(&again, &node.properties["owner"]));
    }
}
