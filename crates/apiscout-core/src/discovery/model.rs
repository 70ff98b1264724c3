use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::parse::parameter::ParameterLocation;
use crate::parse::security::SecurityRequirement;
use crate::schema::SchemaInfo;

/// A flattened, read-only view of one declared operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedOperation {
    /// Uppercase HTTP verb.
    pub method: String,
    /// Declared path template, e.g. `/users/{id}`.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// `operation_id` when declared, otherwise derived from the route.
    pub display_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,

    pub path_params: Vec<ParameterInfo>,
    pub query_params: Vec<ParameterInfo>,
    pub header_params: Vec<ParameterInfo>,
    pub cookie_params: Vec<ParameterInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyInfo>,
    pub responses: IndexMap<String, ResponseInfo>,

    /// Operation-level requirements as declared; `None` inherits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    pub auth_methods: Vec<String>,
    pub auth_source: AuthSource,

    pub server_urls: Vec<String>,
    pub guidance: Guidance,
}

impl EnrichedOperation {
    /// Index key: uppercase verb, a space, then the path template.
    pub fn key(&self) -> String {
        operation_key(&self.method, &self.path)
    }

    /// Parameters across all locations: path, query, header, cookie.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterInfo> {
        self.path_params
            .iter()
            .chain(&self.query_params)
            .chain(&self.header_params)
            .chain(&self.cookie_params)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters().find(|p| p.name == name)
    }

    pub fn requires_auth(&self) -> bool {
        !self.auth_methods.is_empty()
    }
}

pub fn operation_key(method: &str, path: &str) -> String {
    format!("{} {}", method.to_uppercase(), path)
}

/// Where an operation's authentication requirement comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSource {
    /// Declared on the operation.
    Operation,
    /// Inherited from the document.
    Document,
    /// The operation declares `security: []`.
    Disabled,
    /// Nothing declared anywhere.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub deprecated: bool,
    pub schema: SchemaInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBodyInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseInfo {
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaInfo>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, HeaderInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

/// Generated natural-language help for calling an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Guidance {
    pub usage: String,
    /// Parameter name → guidance.
    pub parameters: IndexMap<String, String>,
    /// Status code → guidance, for error and `default` responses.
    pub errors: IndexMap<String, String>,
    pub constraints: Vec<String>,
    pub examples: Vec<OperationExample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationExample {
    pub name: String,
    pub description: String,
    pub parameters: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<String>,
}

/// Everything a caller needs to pick and call an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoverySummary {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub server_urls: Vec<String>,
    /// Scheme name → one-line description.
    pub security_schemes: IndexMap<String, String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webhooks: Vec<String>,
    pub operations: Vec<EnrichedOperation>,
    pub guidance: String,
}
