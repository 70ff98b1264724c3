use std::sync::Arc;
use std::time::Duration;

use apiscout_core::config::ScoutConfig;
use apiscout_core::fetch::build_client;
use log::{debug, info};
use serde_json::{Map, Value};

use crate::cache::GraphCache;
use crate::catalog::GraphCatalog;
use crate::client::{GraphClient, GraphRequest, GraphResponse};
use crate::error::GraphError;
use crate::query::parse_query;

/// Entry point for graph endpoints: discovery with caching, and checked
/// execution.
///
/// Queries are parsed before they are sent. When the endpoint's catalog is
/// cached they are also checked against it; otherwise they go out unchecked.
#[derive(Clone)]
pub struct GraphExplorer {
    http: reqwest::Client,
    timeout: Duration,
    cache: Arc<GraphCache>,
}

impl GraphExplorer {
    /// An explorer with its own catalog cache.
    pub fn new(config: &ScoutConfig) -> Result<Self, GraphError> {
        let cache = Arc::new(GraphCache::from_config(&config.cache));
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: &ScoutConfig, cache: Arc<GraphCache>) -> Result<Self, GraphError> {
        Ok(Self {
            http: build_client(&config.fetch)?,
            timeout: config.fetch.timeout(),
            cache,
        })
    }

    pub fn cache(&self) -> &Arc<GraphCache> {
        &self.cache
    }

    fn client(&self, endpoint: &str) -> GraphClient {
        GraphClient::with_client(self.http.clone(), endpoint, self.timeout)
    }

    /// The catalog for `endpoint`, introspecting it on a cache miss.
    pub async fn discover_graph(&self, endpoint: &str) -> Result<Arc<GraphCatalog>, GraphError> {
        if let Some(catalog) = self.cache.get(endpoint) {
            return Ok(catalog);
        }
        let schema = self.client(endpoint).introspect().await?;
        let catalog = Arc::new(GraphCatalog::build(endpoint, &schema));
        info!("discovered {} graph operations at {endpoint}", catalog.len());
        self.cache.set(endpoint, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Parse, check and send one query.
    ///
    /// Server-reported errors come back inside the response; only transport,
    /// decode, syntax and pre-flight failures are errors here.
    pub async fn execute_graph(
        &self,
        endpoint: &str,
        query: &str,
        variables: Option<Map<String, Value>>,
        operation_name: Option<&str>,
    ) -> Result<GraphResponse, GraphError> {
        let doc = parse_query(query)?;
        let problems = match self.cache.get(endpoint) {
            Some(catalog) => catalog.check(&doc, operation_name),
            None => {
                debug!("no cached catalog for {endpoint}, sending unchecked");
                doc.operation(operation_name).err().into_iter().collect()
            }
        };
        if !problems.is_empty() {
            return Err(GraphError::Validation(problems));
        }

        let request = GraphRequest {
            query: query.to_string(),
            variables,
            operation_name: operation_name.map(str::to_string),
        };
        self.client(endpoint).execute(&request).await
    }

    /// Drop the cached catalog so the next discovery introspects again.
    pub fn invalidate(&self, endpoint: &str) -> bool {
        self.cache.invalidate(endpoint)
    }
}
