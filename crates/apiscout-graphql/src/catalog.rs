//! Operation catalog built from an introspection result.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::introspection::{Field, FullType, IntrospectionSchema, TypeKind, TypeRef};
use crate::query::{OperationKind, QueryDocument};

/// Selectable fields listed per operation.
const MAX_LISTED_FIELDS: usize = 10;
/// Leaf fields placed in an example selection.
const MAX_EXAMPLE_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// One root field of the query, mutation or subscription type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphOperation {
    pub kind: OperationKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Return type in SDL notation.
    pub returns: String,
    pub arguments: Vec<GraphArgument>,
    pub required_args: Vec<String>,
    /// Up to ten field names of the return type, sorted.
    pub available_fields: Vec<String>,
    pub example: String,
    pub deprecated: bool,
}

impl GraphOperation {
    pub fn argument(&self, name: &str) -> Option<&GraphArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// Everything a caller needs to write queries against one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphCatalog {
    pub endpoint: String,
    pub queries: Vec<GraphOperation>,
    pub mutations: Vec<GraphOperation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<GraphOperation>,
    /// Named non-scalar types worth describing, by name.
    pub types: IndexMap<String, TypeSummary>,
    /// Root type names, so checks can tell "no such field" from "no such root".
    #[serde(skip)]
    roots: IndexMap<OperationKind, String>,
}

impl GraphCatalog {
    pub fn build(endpoint: &str, schema: &IntrospectionSchema) -> Self {
        let mut roots = IndexMap::new();
        let declared = [
            (OperationKind::Query, &schema.query_type),
            (OperationKind::Mutation, &schema.mutation_type),
            (OperationKind::Subscription, &schema.subscription_type),
        ];
        for (kind, named) in declared {
            if let Some(named) = named {
                roots.insert(kind, named.name.clone());
            }
        }

        let root_operations = |kind: OperationKind| -> Vec<GraphOperation> {
            roots
                .get(&kind)
                .and_then(|name| schema.get_type(name))
                .map(|root| operations(schema, root, kind))
                .unwrap_or_default()
        };
        let queries = root_operations(OperationKind::Query);
        let mutations = root_operations(OperationKind::Mutation);
        let subscriptions = root_operations(OperationKind::Subscription);

        let mut important: Vec<&FullType> = schema
            .types
            .iter()
            .filter(|t| is_important(t))
            .collect();
        important.sort_by(|a, b| a.name.cmp(&b.name));
        let types = important
            .into_iter()
            .filter_map(|t| Some((t.name.clone()?, summarize(t))))
            .collect();

        debug!(
            "catalog for {endpoint}: {} queries, {} mutations, {} subscriptions",
            queries.len(),
            mutations.len(),
            subscriptions.len()
        );
        Self {
            endpoint: endpoint.to_string(),
            queries,
            mutations,
            subscriptions,
            types,
            roots,
        }
    }

    pub fn operations(&self, kind: OperationKind) -> &[GraphOperation] {
        match kind {
            OperationKind::Query => &self.queries,
            OperationKind::Mutation => &self.mutations,
            OperationKind::Subscription => &self.subscriptions,
        }
    }

    pub fn find(&self, kind: OperationKind, name: &str) -> Option<&GraphOperation> {
        self.operations(kind).iter().find(|op| op.name == name)
    }

    pub fn len(&self) -> usize {
        self.queries.len() + self.mutations.len() + self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pre-flight check of the operation a request would run: unknown root
    /// fields, unknown arguments and missing required arguments. Returns one
    /// message per problem.
    pub fn check(&self, doc: &QueryDocument, operation_name: Option<&str>) -> Vec<String> {
        let op = match doc.operation(operation_name) {
            Ok(op) => op,
            Err(message) => return vec![message],
        };
        let Some(root) = self.roots.get(&op.kind) else {
            return vec![format!("schema does not support {} operations", op.kind)];
        };

        let mut problems = Vec::new();
        for field in &op.fields {
            if field.name.starts_with("__") {
                continue;
            }
            let Some(declared) = self.find(op.kind, &field.name) else {
                problems.push(format!(
                    "field '{}' doesn't exist on type '{root}'",
                    field.name
                ));
                continue;
            };
            for arg in &field.arguments {
                if declared.argument(arg).is_none() {
                    problems.push(format!(
                        "unknown argument '{arg}' on field '{root}.{}'",
                        field.name
                    ));
                }
            }
            for required in &declared.required_args {
                if !field.arguments.contains(required) {
                    let type_name = declared
                        .argument(required)
                        .map(|a| a.type_name.as_str())
                        .unwrap_or("?");
                    problems.push(format!(
                        "field '{}' argument '{required}' of type '{type_name}' is required but not provided",
                        field.name
                    ));
                }
            }
        }
        problems
    }
}

fn operations(schema: &IntrospectionSchema, root: &FullType, kind: OperationKind) -> Vec<GraphOperation> {
    let mut ops: Vec<GraphOperation> = root
        .fields()
        .iter()
        .filter(|f| !f.name.starts_with("__"))
        .map(|f| operation(schema, f, kind))
        .collect();
    ops.sort_by(|a, b| a.name.cmp(&b.name));
    ops
}

fn operation(schema: &IntrospectionSchema, field: &Field, kind: OperationKind) -> GraphOperation {
    let arguments: Vec<GraphArgument> = field
        .args
        .iter()
        .map(|arg| GraphArgument {
            name: arg.name.clone(),
            type_name: arg.type_ref.to_string(),
            description: arg.description.clone(),
            required: arg.is_required(),
            default_value: arg.default_value.clone(),
        })
        .collect();
    let required_args = arguments
        .iter()
        .filter(|a| a.required)
        .map(|a| a.name.clone())
        .collect();

    let return_type = schema.get_type(field.type_ref.base_name());
    let mut available_fields: Vec<String> = return_type
        .map(|t| t.fields().iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default();
    available_fields.sort();
    available_fields.truncate(MAX_LISTED_FIELDS);

    GraphOperation {
        kind,
        name: field.name.clone(),
        description: field.description.clone(),
        returns: field.type_ref.to_string(),
        example: example(kind, field, return_type),
        arguments,
        required_args,
        available_fields,
        deprecated: field.is_deprecated,
    }
}

/// `query { user(id: "id123") { id name } }`. Required arguments only;
/// the selection lists the first leaf fields of the return type.
fn example(kind: OperationKind, field: &Field, return_type: Option<&FullType>) -> String {
    let mut out = format!("{kind} {{ {}", field.name);

    let args: Vec<String> = field
        .args
        .iter()
        .filter(|a| a.is_required())
        .map(|a| format!("{}: {}", a.name, example_literal(&a.type_ref)))
        .collect();
    if !args.is_empty() {
        out.push_str(&format!("({})", args.join(", ")));
    }

    if let Some(t) = return_type.filter(|t| !t.kind.is_leaf()) {
        let leaves: Vec<&str> = t
            .fields()
            .iter()
            .filter(|f| f.args.iter().all(|a| !a.is_required()))
            .filter(|f| f.type_ref.base().kind.is_leaf())
            .map(|f| f.name.as_str())
            .take(MAX_EXAMPLE_FIELDS)
            .collect();
        let selection = if leaves.is_empty() {
            "__typename".to_string()
        } else {
            leaves.join(" ")
        };
        out.push_str(&format!(" {{ {selection} }}"));
    }
    out.push_str(" }");
    out
}

fn example_literal(type_ref: &TypeRef) -> String {
    match type_ref.kind {
        TypeKind::NonNull => match type_ref.of_type {
            Some(ref inner) => example_literal(inner),
            None => "null".to_string(),
        },
        TypeKind::List => match type_ref.of_type {
            Some(ref inner) => format!("[{}]", example_literal(inner)),
            None => "[]".to_string(),
        },
        TypeKind::InputObject => "{}".to_string(),
        _ => match type_ref.base_name() {
            "String" => "\"example\"".to_string(),
            "Int" => "123".to_string(),
            "Float" => "123.45".to_string(),
            "Boolean" => "true".to_string(),
            "ID" => "\"id123\"".to_string(),
            _ => "null".to_string(),
        },
    }
}

/// Non-scalar, non-introspection types that carry a description, more than
/// one field or input field, or enum values.
fn is_important(t: &FullType) -> bool {
    if t.name.is_none() || t.is_introspection() || t.kind == TypeKind::Scalar {
        return false;
    }
    t.description.as_deref().is_some_and(|d| !d.is_empty())
        || t.fields().len() + t.input_fields.as_deref().map_or(0, <[_]>::len) > 1
        || !t.enum_values().is_empty()
}

fn summarize(t: &FullType) -> TypeSummary {
    let mut fields: Vec<String> = match t.kind {
        TypeKind::Object | TypeKind::Interface => {
            t.fields().iter().map(|f| f.name.clone()).collect()
        }
        TypeKind::InputObject => t
            .input_fields
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|f| f.name.clone())
            .collect(),
        _ => Vec::new(),
    };
    fields.sort();
    let mut enum_values: Vec<String> = t.enum_values().iter().map(|v| v.name.clone()).collect();
    enum_values.sort();
    TypeSummary {
        kind: t.kind,
        description: t.description.clone(),
        fields,
        enum_values,
    }
}
