use apiscout_core::error::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Connection failure, timeout or non-success HTTP status.
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("query syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("query failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("introspection failed: {0}")]
    Introspection(String),
}

impl GraphError {
    pub fn hint(&self) -> &'static str {
        match self {
            GraphError::Transport(e) => e.hint(),
            GraphError::Decode { .. } => {
                "The endpoint did not answer with a JSON object. Check that the URL points at a GraphQL server."
            }
            GraphError::Syntax { .. } => {
                "Check for missing braces, parentheses, or incorrect query structure."
            }
            GraphError::Validation(_) => {
                "Run graph discovery to see the available operations, their arguments and fields."
            }
            GraphError::Introspection(_) => {
                "The server may have introspection disabled. Ask the API owner for the schema."
            }
        }
    }
}
