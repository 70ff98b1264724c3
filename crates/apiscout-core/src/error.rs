use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse {origin} as JSON ({json}) or as YAML ({yaml})")]
    Unparseable {
        origin: String,
        json: serde_json::Error,
        yaml: serde_yaml_ng::Error,
    },

    #[error("malformed specification: unsupported OpenAPI version {0}")]
    UnsupportedVersion(String),

    #[error("malformed specification: missing required field {0}")]
    MissingField(String),

    #[error("malformed specification: no paths, components or webhooks declared")]
    NoContent,
}

impl ParseError {
    pub fn hint(&self) -> &'static str {
        match self {
            ParseError::Yaml(_) | ParseError::Json(_) | ParseError::Unparseable { .. } => {
                "Check that the URL points at the raw OpenAPI document and not an HTML page."
            }
            ParseError::UnsupportedVersion(_) => {
                "Only OpenAPI 3.0, 3.1 and 3.2 documents are supported. Convert Swagger 2.0 documents first."
            }
            ParseError::MissingField(_) => {
                "The document must declare `openapi`, `info.title` and `info.version`."
            }
            ParseError::NoContent => {
                "The document must declare at least one of `paths`, `components` or `webhooks`."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("reference target not found: {0}")]
    RefTargetNotFound(String),
}

impl ResolveError {
    pub fn hint(&self) -> &'static str {
        match self {
            ResolveError::InvalidRefFormat(_) => {
                "Only local references of the form `#/components/<section>/<name>` are supported."
            }
            ResolveError::RefTargetNotFound(_) => {
                "The document references a component it does not define. Report it to the API owner."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn hint(&self) -> &'static str {
        match self {
            FetchError::Client(_) => "Check the `fetch` section of the configuration.",
            FetchError::Request { .. } | FetchError::Body { .. } => {
                "Check the URL and network connectivity, then retry."
            }
            FetchError::Timeout { .. } => {
                "The server did not answer in time. Retry later or raise `fetch.timeout_secs`."
            }
            FetchError::Status { status, .. } => match status {
                401 | 403 => "The document requires credentials. Add them under `fetch.headers`.",
                404 => "No document at this URL. Check the path, e.g. /openapi.json or /openapi.yaml.",
                429 => "Rate limited by the server. Wait before retrying.",
                500.. => "The server failed to serve the document. Retry later.",
                _ => "The server rejected the request for the document.",
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("operation not found: {0}")]
    OperationNotFound(String),

    #[error("no operation declared for {method} {path}")]
    RouteNotFound { method: String, path: String },
}

impl LookupError {
    pub fn hint(&self) -> &'static str {
        match self {
            LookupError::OperationNotFound(_) => {
                "Run discovery to list the operation identifiers this API declares."
            }
            LookupError::RouteNotFound { .. } => {
                "Use the declared path template (e.g. /users/{id}), not a URL with values filled in."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl ConfigError {
    pub fn hint(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "Check that the config file exists and is readable.",
            ConfigError::Parse { .. } => {
                "Fix the YAML syntax, or run `apiscout init --force` to regenerate the file."
            }
        }
    }
}

/// Any failure surfaced by the explorer facade.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScoutError {
    pub fn hint(&self) -> &'static str {
        match self {
            ScoutError::Fetch(e) => e.hint(),
            ScoutError::Parse(e) => e.hint(),
            ScoutError::Resolve(e) => e.hint(),
            ScoutError::Lookup(e) => e.hint(),
            ScoutError::Config(e) => e.hint(),
        }
    }
}
