use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::parse::schema::SchemaType;

/// A resolved schema with composition made explicit. Subschemas reached
/// through the same component reference share one allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaInfo {
    AllOf(Vec<Arc<SchemaInfo>>),
    AnyOf(Vec<Arc<SchemaInfo>>),
    OneOf(Vec<Arc<SchemaInfo>>),
    Not(Arc<SchemaInfo>),
    #[serde(untagged)]
    Simple(SchemaNode),
}

/// Rule applied to object keys not listed in `properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Additional {
    #[default]
    Allowed,
    Denied,
    Schema(Arc<SchemaInfo>),
}

impl Additional {
    fn is_allowed(&self) -> bool {
        matches!(self, Additional::Allowed)
    }
}

/// A single non-composed schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exclusive_minimum: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Arc<SchemaInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Arc<SchemaInfo>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Additional::is_allowed")]
    pub additional_properties: Additional,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub write_only: bool,
}

impl SchemaInfo {
    /// A schema that accepts any value.
    pub fn any() -> Self {
        SchemaInfo::Simple(SchemaNode::default())
    }

    pub fn of_type(schema_type: SchemaType) -> Self {
        SchemaInfo::Simple(SchemaNode {
            schema_type: Some(schema_type),
            ..SchemaNode::default()
        })
    }

    /// Wrap a single named value schema in an object schema, optionally
    /// requiring the field.
    pub fn single_field(name: &str, schema: SchemaInfo, required: bool) -> Self {
        let mut properties = IndexMap::new();
        properties.insert(name.to_string(), Arc::new(schema));
        SchemaInfo::Simple(SchemaNode {
            schema_type: Some(SchemaType::Object),
            properties,
            required: if required {
                vec![name.to_string()]
            } else {
                Vec::new()
            },
            ..SchemaNode::default()
        })
    }

    pub fn as_node(&self) -> Option<&SchemaNode> {
        match self {
            SchemaInfo::Simple(node) => Some(node),
            _ => None,
        }
    }

    /// The first concrete type found, looking through composition.
    pub fn primary_type(&self) -> Option<SchemaType> {
        match self {
            SchemaInfo::Simple(node) => node.schema_type,
            SchemaInfo::AllOf(list) | SchemaInfo::AnyOf(list) | SchemaInfo::OneOf(list) => {
                list.iter().find_map(|s| s.primary_type())
            }
            SchemaInfo::Not(_) => None,
        }
    }

    /// Human-readable type name: `string`, `array of integer`, `oneOf`, `any`.
    pub fn type_name(&self) -> String {
        match self {
            SchemaInfo::Simple(node) => match (node.schema_type, &node.items) {
                (Some(SchemaType::Array), Some(items)) => {
                    format!("array of {}", items.type_name())
                }
                (Some(t), _) => t.to_string(),
                (None, _) => "any".to_string(),
            },
            SchemaInfo::AllOf(_) => "allOf".to_string(),
            SchemaInfo::AnyOf(_) => "anyOf".to_string(),
            SchemaInfo::OneOf(_) => "oneOf".to_string(),
            SchemaInfo::Not(_) => "not".to_string(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.as_node().and_then(|n| n.description.as_deref())
    }

    /// Compact constraint summary, e.g. `min: 1, max: 10, pattern: ^a`, or `none`.
    pub fn constraint_summary(&self) -> String {
        let Some(node) = self.as_node() else {
            return "none".to_string();
        };
        let mut parts = Vec::new();
        if let Some(min) = node.minimum {
            parts.push(format!("min: {min}"));
        }
        if let Some(max) = node.maximum {
            parts.push(format!("max: {max}"));
        }
        if let Some(min) = node.min_length {
            parts.push(format!("minLength: {min}"));
        }
        if let Some(max) = node.max_length {
            parts.push(format!("maxLength: {max}"));
        }
        if let Some(ref pattern) = node.pattern {
            parts.push(format!("pattern: {pattern}"));
        }
        if !node.enum_values.is_empty() {
            parts.push(format!("enum: {}", render_values(&node.enum_values)));
        }
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Render values as `[a, b, 3]` with strings unquoted.
pub fn render_values(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(render_value).collect();
    format!("[{}]", items.join(", "))
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A `pattern` constraint, compiled once when the schema is built.
///
/// Patterns the regex engine rejects are kept for display and match
/// everything.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("skipping invalid pattern {source}: {e}");
                None
            }
        };
        Self { source, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_compiled(&self) -> bool {
        self.regex.is_some()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.as_ref().is_none_or(|re| re.is_match(s))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
