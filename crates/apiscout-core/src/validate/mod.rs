//! Request and response checking against a discovered operation.

pub mod guidance;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::discovery::{EnrichedOperation, OperationDiscovery, ParameterInfo};
use crate::error::LookupError;
use crate::schema::{IssueKind, SchemaInfo, SchemaValidator, ValidationIssue, coerce_value};

/// How strictly a request is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Do not report missing required parameters, body or body fields.
    pub skip_required: bool,
    /// Ignore range, length, pattern, enum, format and item-count limits.
    pub skip_constraints: bool,
    /// Accept any parameter value and skip body schema checks.
    pub skip_type_checking: bool,
    /// Convert loosely typed parameter values before checking them.
    pub allow_coercion: bool,
}

/// Outcome for one parameter or for the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub field_path: String,
    pub expected_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
    pub constraints: String,
}

impl FieldResult {
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn has(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationGuidance {
    pub summary: String,
    /// Parameter name → explanation, for failing parameters only.
    pub parameters: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Aggregated result of checking one request. Invalid requests are reported
/// here, never as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub operation_id: String,
    /// Declared parameters that were supplied or are required.
    pub parameters: IndexMap<String, FieldResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<FieldResult>,
    /// Non-fatal observations, such as undeclared parameters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub guidance: ValidationGuidance,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    /// Number of failing fields, the body counting as one.
    pub fn error_count(&self) -> usize {
        self.parameters.values().filter(|r| !r.valid).count()
            + usize::from(self.request_body.as_ref().is_some_and(|b| !b.valid))
    }
}

/// Checks requests and responses against the operations of one document.
pub struct ValidationEngine<'a> {
    discovery: &'a OperationDiscovery,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(discovery: &'a OperationDiscovery) -> Self {
        Self { discovery }
    }

    /// Validate parameters and an optional body for `operation_id`.
    ///
    /// With coercion enabled, converted values are written back into
    /// `params`. Only an unknown operation is an error.
    pub fn validate_request(
        &self,
        operation_id: &str,
        params: &mut Map<String, Value>,
        body: Option<&Value>,
        options: &ValidationOptions,
    ) -> Result<ValidationReport, LookupError> {
        let op = self
            .discovery
            .find_by_id(operation_id)
            .ok_or_else(|| LookupError::OperationNotFound(operation_id.to_string()))?;
        let validator = SchemaValidator {
            check_required: !options.skip_required,
            check_constraints: !options.skip_constraints,
        };

        let mut parameters = IndexMap::new();
        for param in op.parameters() {
            if let Some(result) = check_parameter(param, params, &validator, options) {
                parameters.insert(param.name.clone(), result);
            }
        }

        let warnings = params
            .keys()
            .filter(|name| op.parameter(name).is_none())
            .map(|name| {
                format!(
                    "parameter '{name}' is not declared by operation {}",
                    op.display_id
                )
            })
            .collect();

        let request_body = check_body(&op, body, &validator, options);

        let mut report = ValidationReport {
            valid: true,
            operation_id: operation_id.to_string(),
            parameters,
            request_body,
            warnings,
            guidance: ValidationGuidance::default(),
            suggestions: Vec::new(),
        };
        report.valid = report.error_count() == 0;
        report.guidance = guidance::build(&report, &op);
        report.suggestions = guidance::suggestions(&report, &op);
        debug!(
            "validated {operation_id}: {} error(s)",
            report.error_count()
        );
        Ok(report)
    }

    /// Validate a response body against the schema declared for `status`.
    ///
    /// Undeclared status codes are invalid; responses without a schema are
    /// valid.
    pub fn validate_response(
        &self,
        operation_id: &str,
        status: &str,
        body: Option<&Value>,
    ) -> Result<FieldResult, LookupError> {
        let op = self
            .discovery
            .find_by_id(operation_id)
            .ok_or_else(|| LookupError::OperationNotFound(operation_id.to_string()))?;
        let wildcard = status
            .chars()
            .next()
            .map(|c| format!("{c}XX"))
            .unwrap_or_default();
        let response = op
            .responses
            .get(status)
            .or_else(|| op.responses.get(&wildcard))
            .or_else(|| op.responses.get("default"));

        let field_path = format!("response.{status}");
        let Some(response) = response else {
            return Ok(FieldResult {
                valid: false,
                errors: vec![ValidationIssue::new(
                    "",
                    IssueKind::UndeclaredStatus,
                    format!(
                        "status code {status} is not declared for operation {}",
                        op.display_id
                    ),
                )],
                field_path,
                expected_type: "declared status".to_string(),
                actual_value: None,
                constraints: format!(
                    "declared: {}",
                    op.responses.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            });
        };

        let (errors, expected_type) = match (&response.schema, body) {
            (Some(schema), Some(body)) => (
                SchemaValidator::default().validate(schema, body),
                schema.type_name(),
            ),
            (Some(schema), None) => (Vec::new(), schema.type_name()),
            (None, _) => (Vec::new(), "any".to_string()),
        };
        Ok(FieldResult {
            valid: errors.is_empty(),
            errors,
            field_path,
            expected_type,
            actual_value: None,
            constraints: "Must match response schema".to_string(),
        })
    }
}

fn check_parameter(
    param: &ParameterInfo,
    params: &mut Map<String, Value>,
    validator: &SchemaValidator,
    options: &ValidationOptions,
) -> Option<FieldResult> {
    let mut result = FieldResult {
        valid: true,
        errors: Vec::new(),
        field_path: param.name.clone(),
        expected_type: param.schema.type_name(),
        actual_value: None,
        constraints: param.schema.constraint_summary(),
    };

    let Some(supplied) = params.get(&param.name) else {
        if param.required && !options.skip_required {
            result.valid = false;
            result.errors.push(ValidationIssue::new(
                param.name.as_str(),
                IssueKind::Required,
                format!("required parameter '{}' is missing", param.name),
            ));
            return Some(result);
        }
        return None;
    };

    let mut value = supplied.clone();
    if options.allow_coercion {
        let coerced = coerce_value(&param.schema, &value);
        if coerced != value {
            debug!("coerced parameter {} from {value} to {coerced}", param.name);
            params.insert(param.name.clone(), coerced.clone());
            value = coerced;
        }
    }

    if !options.skip_type_checking {
        let schema = SchemaInfo::single_field(&param.name, param.schema.clone(), false);
        let mut wrapped = Map::new();
        wrapped.insert(param.name.clone(), value.clone());
        result.errors = validator.validate(&schema, &Value::Object(wrapped));
        result.valid = result.errors.is_empty();
    }
    result.actual_value = Some(value);
    Some(result)
}

fn check_body(
    op: &EnrichedOperation,
    body: Option<&Value>,
    validator: &SchemaValidator,
    options: &ValidationOptions,
) -> Option<FieldResult> {
    let declared = op.request_body.as_ref();
    let expected_type = declared
        .and_then(|b| b.schema.as_ref())
        .map(SchemaInfo::type_name)
        .unwrap_or_else(|| "none".to_string());
    let failed = |kind: IssueKind, message: &str| FieldResult {
        valid: false,
        errors: vec![ValidationIssue::new("", kind, message)],
        field_path: "requestBody".to_string(),
        expected_type: expected_type.clone(),
        actual_value: None,
        constraints: "Must match operation schema".to_string(),
    };

    match (declared, body) {
        (None, Some(_)) => Some(failed(
            IssueKind::UnexpectedBody,
            "operation does not expect a request body",
        )),
        (Some(rb), None) if rb.required && !options.skip_required => {
            Some(failed(IssueKind::Required, "required request body is missing"))
        }
        (Some(rb), Some(body)) if !options.skip_type_checking => {
            let errors = rb
                .schema
                .as_ref()
                .map(|schema| validator.validate(schema, body))
                .unwrap_or_default();
            Some(FieldResult {
                valid: errors.is_empty(),
                errors,
                field_path: "requestBody".to_string(),
                expected_type: expected_type.clone(),
                actual_value: None,
                constraints: "Must match operation schema".to_string(),
            })
        }
        _ => None,
    }
}
