//! The fixed schema-discovery query and the typed shape of its result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Full type, input value and seven-level type reference fragments.
pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType {
                kind
                name
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// The `data` member of an introspection response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IntrospectionData {
    #[serde(rename = "__schema")]
    pub schema: IntrospectionSchema,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionSchema {
    pub query_type: Option<NamedType>,
    #[serde(default)]
    pub mutation_type: Option<NamedType>,
    #[serde(default)]
    pub subscription_type: Option<NamedType>,
    #[serde(default)]
    pub types: Vec<FullType>,
}

impl IntrospectionSchema {
    pub fn get_type(&self, name: &str) -> Option<&FullType> {
        self.types.iter().find(|t| t.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NamedType {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
            TypeKind::List => "LIST",
            TypeKind::NonNull => "NON_NULL",
        }
    }

    /// Scalars and enums take no selection set.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullType {
    pub kind: TypeKind,
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    #[serde(default)]
    pub input_fields: Option<Vec<InputValue>>,
    #[serde(default)]
    pub interfaces: Option<Vec<TypeRef>>,
    #[serde(default)]
    pub enum_values: Option<Vec<EnumValue>>,
    #[serde(default)]
    pub possible_types: Option<Vec<TypeRef>>,
}

impl FullType {
    pub fn fields(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or_default()
    }

    pub fn enum_values(&self) -> &[EnumValue] {
        self.enum_values.as_deref().unwrap_or_default()
    }

    /// Built-in types such as `__Type` and `__Schema`.
    pub fn is_introspection(&self) -> bool {
        self.name.as_deref().is_some_and(|n| n.starts_with("__"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<InputValue>,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub is_deprecated: bool,
    #[serde(default)]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl InputValue {
    /// Non-null without a default must be supplied.
    pub fn is_required(&self) -> bool {
        self.type_ref.kind == TypeKind::NonNull && self.default_value.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_deprecated: bool,
}

/// A possibly wrapped reference to a named type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    /// The innermost reference, with list and non-null wrappers removed.
    pub fn base(&self) -> &TypeRef {
        let mut current = self;
        while let Some(ref inner) = current.of_type {
            current = &**inner;
        }
        current
    }

    pub fn base_name(&self) -> &str {
        self.base().name.as_deref().unwrap_or("Unknown")
    }

    pub fn is_non_null(&self) -> bool {
        self.kind == TypeKind::NonNull
    }
}

/// Renders in SDL notation, e.g. `[User!]!`.
impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, &self.of_type) {
            (TypeKind::NonNull, Some(inner)) => write!(f, "{inner}!"),
            (TypeKind::List, Some(inner)) => write!(f, "[{inner}]"),
            _ => f.write_str(self.name.as_deref().unwrap_or("Unknown")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn type_ref(value: serde_json::Value) -> TypeRef {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn renders_wrapped_types() {
        let t = type_ref(json!({
            "kind": "NON_NULL", "name": null,
            "ofType": {"kind": "LIST", "name": null,
                "ofType": {"kind": "NON_NULL", "name": null,
                    "ofType": {"kind": "OBJECT", "name": "User", "ofType": null}}}
        }));
        assert_eq!(t.to_string(), "[User!]!");
        assert_eq!(t.base_name(), "User");
        assert!(t.is_non_null());
    }

    #[test]
    fn required_means_non_null_without_default() {
        let arg = |default: Option<&str>| InputValue {
            name: "first".into(),
            description: None,
            type_ref: type_ref(json!({
                "kind": "NON_NULL",
                "ofType": {"kind": "SCALAR", "name": "Int"}
            })),
            default_value: default.map(String::from),
        };
        assert!(arg(None).is_required());
        assert!(!arg(Some("10")).is_required());
    }
}
