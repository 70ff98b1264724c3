use indexmap::IndexSet;

use super::{FieldResult, ValidationGuidance, ValidationReport};
use crate::discovery::{EnrichedOperation, ParameterInfo};
use crate::schema::model::render_value;
use crate::schema::{IssueKind, example_value};

pub fn build(report: &ValidationReport, op: &EnrichedOperation) -> ValidationGuidance {
    let parameters = report
        .parameters
        .iter()
        .filter(|(_, result)| !result.valid)
        .map(|(name, result)| {
            let text = match op.parameter(name) {
                Some(param) => parameter_guidance(param, result),
                None => format!("Parameter '{name}' validation failed"),
            };
            (name.clone(), text)
        })
        .collect();
    let body = report
        .request_body
        .as_ref()
        .filter(|b| !b.valid)
        .map(|b| body_guidance(op, b));
    ValidationGuidance {
        summary: summary(report),
        parameters,
        body,
    }
}

pub fn summary(report: &ValidationReport) -> String {
    match report.error_count() {
        0 => "Request validation passed successfully".to_string(),
        1 => "Request validation failed with 1 error".to_string(),
        n => format!("Request validation failed with {n} errors"),
    }
}

/// Explain each failure of one parameter, then show an acceptable value.
pub fn parameter_guidance(param: &ParameterInfo, result: &FieldResult) -> String {
    let name = &param.name;
    let node = param.schema.as_node();
    let mut parts: IndexSet<String> = IndexSet::new();
    for issue in &result.errors {
        let text = match issue.kind {
            IssueKind::Required => format!("Parameter '{name}' is required for this operation."),
            IssueKind::Type => format!(
                "Parameter '{name}' must be of type {}.",
                param.schema.type_name()
            ),
            IssueKind::Length => match node.map(|n| (n.min_length, n.max_length)) {
                Some((Some(min), Some(max))) => {
                    format!("Parameter '{name}' must be between {min} and {max} characters.")
                }
                _ => format!("Parameter '{name}' {}.", issue.message),
            },
            IssueKind::Pattern => match node.and_then(|n| n.pattern.as_ref()) {
                Some(pattern) => format!("Parameter '{name}' must match pattern: {pattern}."),
                None => format!("Parameter '{name}' {}.", issue.message),
            },
            IssueKind::Range | IssueKind::Enum | IssueKind::Format | IssueKind::Items => {
                format!("Parameter '{name}' {}.", issue.message)
            }
            _ => format!("Parameter '{name}': {}.", issue.message),
        };
        parts.insert(text);
    }
    let example = param
        .example
        .clone()
        .unwrap_or_else(|| example_value(&param.schema));
    if !example.is_null() {
        parts.insert(format!("Example: {}", render_value(&example)));
    }
    parts.into_iter().collect::<Vec<_>>().join(" ")
}

pub fn body_guidance(op: &EnrichedOperation, result: &FieldResult) -> String {
    let Some(ref declared) = op.request_body else {
        return "This operation does not expect a request body. Send the request without one."
            .to_string();
    };
    if result.has(IssueKind::Required) && result.errors.iter().any(|e| e.path.is_empty()) {
        return format!(
            "This operation requires a request body. Supported content types: {}.",
            declared.content_types.join(", ")
        );
    }

    let mut parts: IndexSet<String> = IndexSet::new();
    parts.insert("Request body validation failed.".to_string());
    for issue in &result.errors {
        let text = match issue.kind {
            IssueKind::Required => "Ensure all required fields are included.",
            IssueKind::Type => "Check that field types match the expected schema.",
            IssueKind::Format => "Verify that field formats (email, date, etc.) are correct.",
            IssueKind::AdditionalProperty => "Remove fields the schema does not declare.",
            IssueKind::Composition => "Make sure the body matches one of the allowed shapes.",
            _ => "Check that field values satisfy the declared constraints.",
        };
        parts.insert(text.to_string());
    }
    if !declared.content_types.is_empty() {
        parts.insert(format!(
            "Supported content types: {}.",
            declared.content_types.join(", ")
        ));
    }
    if let Some(ref schema) = declared.schema {
        parts.insert(format!("Expected schema type: {}.", schema.type_name()));
    }
    parts.into_iter().collect::<Vec<_>>().join(" ")
}

/// One imperative sentence per failing field and error category.
pub fn suggestions(report: &ValidationReport, op: &EnrichedOperation) -> Vec<String> {
    let mut out: IndexSet<String> = IndexSet::new();
    if report.valid {
        return Vec::new();
    }

    for (name, result) in report.parameters.iter().filter(|(_, r)| !r.valid) {
        for issue in &result.errors {
            let text = match issue.kind {
                IssueKind::Required => format!("Add the required parameter '{name}' to your request"),
                IssueKind::Type => format!(
                    "Convert parameter '{name}' to the correct type ({})",
                    result.expected_type
                ),
                IssueKind::Range
                | IssueKind::Length
                | IssueKind::Pattern
                | IssueKind::Enum
                | IssueKind::Items => format!(
                    "Adjust parameter '{name}' to meet constraints: {}",
                    result.constraints
                ),
                _ => format!(
                    "Fix validation error for parameter '{name}': {}",
                    issue.message
                ),
            };
            out.insert(text);
        }
    }

    if let Some(body) = report.request_body.as_ref().filter(|b| !b.valid) {
        if body.has(IssueKind::UnexpectedBody) {
            out.insert("Remove the request body; this operation does not accept one".to_string());
        } else {
            out.insert(
                "Review request body structure and ensure it matches the expected schema"
                    .to_string(),
            );
            if op
                .request_body
                .as_ref()
                .is_some_and(|b| !b.examples.is_empty())
            {
                out.insert(
                    "Refer to the provided examples for correct request body format".to_string(),
                );
            }
        }
    }

    if out.len() > 2 {
        out.insert(
            "Consider using request validation tools or API documentation for guidance"
                .to_string(),
        );
    }
    out.into_iter().collect()
}
