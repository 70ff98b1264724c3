use indexmap::IndexMap;
use serde_json::Value;

use super::model::{
    AuthSource, EnrichedOperation, Guidance, OperationExample, ParameterInfo, ResponseInfo,
};
use crate::schema::example_value;
use crate::schema::model::render_values;

pub fn generate(op: &EnrichedOperation) -> Guidance {
    Guidance {
        usage: usage_instructions(op),
        parameters: op
            .parameters()
            .map(|p| (p.name.clone(), parameter_guidance(p)))
            .collect(),
        errors: op
            .responses
            .iter()
            .filter(|(status, _)| {
                status.starts_with('4') || status.starts_with('5') || *status == "default"
            })
            .map(|(status, resp)| (status.clone(), error_guidance(status, resp)))
            .collect(),
        constraints: constraints(op),
        examples: vec![basic_example(op)],
    }
}

pub fn usage_instructions(op: &EnrichedOperation) -> String {
    let action = match op.summary.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.trim_end_matches('.').to_lowercase(),
        _ => format!("call {}", op.path),
    };
    let mut sentences = vec![format!("Use this {} operation to {action}", op.method)];
    if let Some(desc) = op.description.as_deref().map(str::trim) {
        if !desc.is_empty() {
            sentences.push(desc.trim_end_matches('.').to_string());
        }
    }
    if !op.path_params.is_empty() {
        sentences.push(
            "Path parameters are required and must be provided in the endpoint URL".to_string(),
        );
    }
    if !op.query_params.is_empty() {
        sentences.push("Query parameters can be used to filter or modify the request".to_string());
    }
    if op.request_body.as_ref().is_some_and(|b| b.required) {
        sentences.push("This operation requires a request body".to_string());
    }
    if op.requires_auth() {
        sentences.push(format!(
            "Authentication required using: {}",
            op.auth_methods.join(", ")
        ));
    } else if op.auth_source == AuthSource::Disabled {
        sentences.push("This operation explicitly requires no authentication".to_string());
    }
    format!("{}.", sentences.join(". "))
}

/// Type, format, numeric range, length range, enum and pattern, in that
/// order, skipping absent ones.
pub fn parameter_guidance(param: &ParameterInfo) -> String {
    let mut parts = vec![if param.required {
        "Required parameter.".to_string()
    } else {
        "Optional parameter.".to_string()
    }];
    if param.schema.primary_type().is_some() {
        parts.push(format!("Type: {}.", param.schema.type_name()));
    }
    if let Some(node) = param.schema.as_node() {
        if let Some(ref format) = node.format {
            parts.push(format!("Format: {format}."));
        }
        match (node.minimum, node.maximum) {
            (Some(min), Some(max)) => parts.push(format!("Valid range: {min} to {max}.")),
            (Some(min), None) => parts.push(format!("Minimum value: {min}.")),
            (None, Some(max)) => parts.push(format!("Maximum value: {max}.")),
            (None, None) => {}
        }
        match (node.min_length, node.max_length) {
            (Some(min), Some(max)) => parts.push(format!("Length: {min} to {max} characters.")),
            (Some(min), None) => parts.push(format!("Minimum length: {min}.")),
            (None, Some(max)) => parts.push(format!("Maximum length: {max}.")),
            (None, None) => {}
        }
        if !node.enum_values.is_empty() {
            parts.push(format!("Valid values: {}.", render_values(&node.enum_values)));
        }
        if let Some(ref pattern) = node.pattern {
            parts.push(format!("Must match pattern: {pattern}."));
        }
    }
    if param.deprecated {
        parts.push("Deprecated.".to_string());
    }
    parts.join(" ")
}

/// Guidance for one declared response, branching on the status class.
pub fn error_guidance(status: &str, response: &ResponseInfo) -> String {
    let desc = response.description.trim();
    let text = match status.as_bytes().first() {
        Some(b'4') => match status {
            "400" => format!("Bad Request - Check parameter values and request format. {desc}"),
            "401" => format!(
                "Unauthorized - Verify authentication credentials are provided and valid. {desc}"
            ),
            "403" => format!(
                "Forbidden - Check if you have permission to access this resource. {desc}"
            ),
            "404" => format!(
                "Not Found - Verify the resource path and parameters are correct. {desc}"
            ),
            "429" => format!("Rate Limited - Wait before making additional requests. {desc}"),
            _ => format!("Client Error - {desc}"),
        },
        Some(b'5') => format!(
            "Server Error - The API server encountered an issue. Retry may resolve temporary problems. {desc}"
        ),
        _ => desc.to_string(),
    };
    text.trim_end().to_string()
}

pub fn constraints(op: &EnrichedOperation) -> Vec<String> {
    let mut out = Vec::new();
    if op.deprecated {
        out.push("This operation is deprecated and may be removed in future versions".to_string());
    }
    if op.requires_auth() {
        out.push("Authentication is required".to_string());
    }
    let required = op.parameters().filter(|p| p.required).count();
    match required {
        0 => {}
        1 => out.push("1 required parameter must be provided".to_string()),
        n => out.push(format!("{n} required parameters must be provided")),
    }
    if op.request_body.as_ref().is_some_and(|b| b.required) {
        out.push("Request body is required".to_string());
    }
    out
}

fn basic_example(op: &EnrichedOperation) -> OperationExample {
    let mut parameters: IndexMap<String, Value> = IndexMap::new();
    for param in &op.path_params {
        parameters.insert(param.name.clone(), param_example(param));
    }
    for param in op.query_params.iter().chain(&op.header_params) {
        if param.example.is_some() || param.required {
            parameters.insert(param.name.clone(), param_example(param));
        }
    }

    let body = op.request_body.as_ref().and_then(|b| {
        b.examples
            .first()
            .map(|e| e.value.clone())
            .or_else(|| b.schema.as_ref().map(example_value))
    });

    let expected_response = ["200", "201"]
        .iter()
        .find_map(|code| op.responses.get_key_value(*code))
        .or_else(|| op.responses.iter().find(|(s, _)| s.starts_with('2')))
        .map(|(status, resp)| format!("HTTP {status}: {}", resp.description));

    OperationExample {
        name: "Basic Usage".to_string(),
        description: format!("Basic {} request to {}", op.method, op.path),
        parameters,
        body,
        expected_response,
    }
}

fn param_example(param: &ParameterInfo) -> Value {
    param
        .example
        .clone()
        .unwrap_or_else(|| example_value(&param.schema))
}
