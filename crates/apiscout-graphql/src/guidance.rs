//! Remediation text for failed graph operations.

use crate::catalog::GraphCatalog;
use crate::client::GraphResponse;
use crate::error::GraphError;

const UNKNOWN_FIELD: &str = "This field doesn't exist on the type. Check the discovered catalog to see available fields.";
const VARIABLE_TYPE: &str =
    "Variable type mismatch. Ensure variables match the expected types defined in the query.";
const SYNTAX: &str =
    "Syntax error. Check for missing braces, parentheses, or incorrect query structure.";
const UNAUTHORIZED: &str =
    "Authentication required. Ensure you've provided the correct authentication credentials.";
const GENERIC: &str = "The operation failed. Run graph discovery to explore available operations and their structure.";

/// Advice for an error message reported by a server.
///
/// Servers word these freely, so this matches on message text.
pub fn message_guidance(message: &str) -> &'static str {
    let msg = message.to_lowercase();
    let unknown_field = msg.contains("field")
        && (msg.contains("doesn't exist")
            || msg.contains("does not exist")
            || msg.contains("cannot query"));
    if unknown_field {
        UNKNOWN_FIELD
    } else if msg.contains("variable") && msg.contains("type") {
        VARIABLE_TYPE
    } else if msg.contains("syntax") || msg.contains("parse") {
        SYNTAX
    } else if msg.contains("unauthorized")
        || msg.contains("unauthenticated")
        || msg.contains("forbidden")
    {
        UNAUTHORIZED
    } else {
        GENERIC
    }
}

/// Advice for a local failure.
pub fn error_guidance(err: &GraphError) -> &'static str {
    match err {
        GraphError::Syntax { .. } => SYNTAX,
        GraphError::Validation(problems) => problems
            .first()
            .map(|p| message_guidance(p))
            .unwrap_or(GENERIC),
        other => other.hint(),
    }
}

/// One line of advice per distinct server-reported error.
pub fn response_guidance(response: &GraphResponse) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for error in &response.errors {
        let advice = message_guidance(&error.message).to_string();
        if !out.contains(&advice) {
            out.push(advice);
        }
    }
    out
}

/// Endpoint-level overview for a discovered catalog.
pub fn catalog_guidance(catalog: &GraphCatalog) -> String {
    let mut out = format!(
        "{} exposes {} quer{}, {} mutation{} and {} subscription{}.",
        catalog.endpoint,
        catalog.queries.len(),
        if catalog.queries.len() == 1 { "y" } else { "ies" },
        catalog.mutations.len(),
        plural(catalog.mutations.len()),
        catalog.subscriptions.len(),
        plural(catalog.subscriptions.len()),
    );
    out.push_str(" Select only the fields you need; required arguments must be supplied inline or as variables.");
    out
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ResponseError;

    #[test]
    fn server_messages_map_to_advice() {
        assert_eq!(
            message_guidance("Cannot query field \"nope\" on type \"Query\"."),
            UNKNOWN_FIELD
        );
        assert_eq!(
            message_guidance("Variable \"$id\" of type \"Int\" used where \"ID!\" expected"),
            VARIABLE_TYPE
        );
        assert_eq!(message_guidance("Syntax Error: Unexpected Name"), SYNTAX);
        assert_eq!(message_guidance("Forbidden"), UNAUTHORIZED);
        assert_eq!(message_guidance("Internal failure"), GENERIC);
    }

    #[test]
    fn response_advice_is_deduplicated() {
        let error = |message: &str| ResponseError {
            message: message.to_string(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        };
        let response = GraphResponse {
            errors: vec![error("Unauthorized"), error("unauthorized"), error("boom")],
            ..GraphResponse::default()
        };
        assert_eq!(
            response_guidance(&response),
            vec![UNAUTHORIZED.to_string(), GENERIC.to_string()]
        );
    }

    #[test]
    fn local_errors_use_typed_advice() {
        let err = GraphError::Validation(vec![
            "field 'users' doesn't exist on type 'Query'".to_string(),
        ]);
        assert_eq!(error_guidance(&err), UNKNOWN_FIELD);
        let err = GraphError::Syntax {
            message: "expected a value".into(),
            line: 1,
            column: 3,
        };
        assert_eq!(error_guidance(&err), SYNTAX);
    }
}
