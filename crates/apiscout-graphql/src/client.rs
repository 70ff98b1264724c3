use std::time::Duration;

use apiscout_core::config::FetchConfig;
use apiscout_core::error::FetchError;
use apiscout_core::fetch::{build_client, classify};
use log::{debug, info};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphError;
use crate::introspection::{INTROSPECTION_QUERY, IntrospectionData, IntrospectionSchema};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }
}

/// A well-formed response. Errors reported by the server live in `errors`
/// and are data, not failures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GraphResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphResponse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Error messages joined with `; `.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Sends queries to one endpoint as a single JSON POST each.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GraphClient {
    pub fn new(endpoint: &str, config: &FetchConfig) -> Result<Self, GraphError> {
        Ok(Self::with_client(build_client(config)?, endpoint, config.timeout()))
    }

    /// Reuse an existing HTTP client, which carries its own headers.
    pub fn with_client(http: reqwest::Client, endpoint: &str, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the request. Connection failures, timeouts and non-success
    /// statuses are transport errors; an `errors` array in a well-formed
    /// body is returned as part of the response.
    pub async fn execute(&self, request: &GraphRequest) -> Result<GraphResponse, GraphError> {
        let url = self.endpoint.as_str();
        debug!("POST {url} ({} bytes of query)", request.query.len());
        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify(url, self.timeout, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = resp.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| GraphError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Run the fixed introspection query and decode the schema it returns.
    pub async fn introspect(&self) -> Result<IntrospectionSchema, GraphError> {
        info!("introspecting {}", self.endpoint);
        let mut request = GraphRequest::new(INTROSPECTION_QUERY);
        request.operation_name = Some("IntrospectionQuery".to_string());
        let response = self.execute(&request).await?;
        if response.has_errors() {
            return Err(GraphError::Introspection(response.error_summary()));
        }
        if response.data.get("__schema").is_none() {
            return Err(GraphError::Introspection(
                "response carries no __schema".to_string(),
            ));
        }
        let data: IntrospectionData = serde_json::from_value(response.data)
            .map_err(|e| GraphError::Introspection(format!("unexpected schema shape: {e}")))?;
        Ok(data.schema)
    }
}
