use std::sync::Arc;
use std::time::Duration;

use log::info;
use serde_json::{Map, Value};

use crate::cache::{SpecCache, SpecEntry};
use crate::config::ScoutConfig;
use crate::discovery::{DiscoverySummary, EnrichedOperation, OperationDiscovery};
use crate::error::{LookupError, ScoutError};
use crate::fetch::SpecFetcher;
use crate::parse;
use crate::validate::{FieldResult, ValidationEngine, ValidationOptions, ValidationReport};

/// Entry point for callers: discovery, lookup and validation by document URL.
///
/// Documents are fetched at most once per TTL. Fetching happens outside the
/// cache lock, so two callers missing on the same URL may both fetch; the
/// last one to finish wins.
#[derive(Clone)]
pub struct ApiExplorer {
    fetcher: SpecFetcher,
    cache: Arc<SpecCache>,
    options: ValidationOptions,
}

impl ApiExplorer {
    /// An explorer with its own cache.
    pub fn new(config: &ScoutConfig) -> Result<Self, ScoutError> {
        let cache = Arc::new(SpecCache::from_config(&config.cache));
        Self::with_cache(config, cache)
    }

    /// An explorer sharing `cache` with other explorers.
    pub fn with_cache(config: &ScoutConfig, cache: Arc<SpecCache>) -> Result<Self, ScoutError> {
        Ok(Self {
            fetcher: SpecFetcher::new(&config.fetch)?,
            cache,
            options: config.validation,
        })
    }

    pub fn cache(&self) -> &Arc<SpecCache> {
        &self.cache
    }

    /// The cached entry for `url`, fetching and parsing it on a miss.
    pub async fn load(&self, url: &str) -> Result<SpecEntry, ScoutError> {
        if let Some(entry) = self.cache.get(url) {
            return Ok(entry);
        }
        let bytes = self.fetcher.fetch(url).await?;
        self.load_bytes(url, &bytes)
    }

    /// Like [`ApiExplorer::load`] with a per-call fetch deadline.
    pub async fn load_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<SpecEntry, ScoutError> {
        if let Some(entry) = self.cache.get(url) {
            return Ok(entry);
        }
        let bytes = self.fetcher.fetch_with_timeout(url, timeout).await?;
        self.load_bytes(url, &bytes)
    }

    /// Parse raw document bytes and cache them under `source`.
    pub fn load_bytes(&self, source: &str, bytes: &[u8]) -> Result<SpecEntry, ScoutError> {
        let document = parse::parse_document(bytes, source)?;
        let discovery = OperationDiscovery::new(&document)?;
        let entry = SpecEntry {
            document: Arc::new(document),
            discovery: Arc::new(discovery),
        };
        info!(
            "loaded {} ({} {})",
            source, entry.document.info.title, entry.document.info.version
        );
        self.cache.set(source, entry.clone());
        Ok(entry)
    }

    pub async fn discover(&self, url: &str) -> Result<DiscoverySummary, ScoutError> {
        let entry = self.load(url).await?;
        Ok(entry.discovery.summary())
    }

    /// Exact lookup by verb and declared path template.
    pub async fn find_operation(
        &self,
        url: &str,
        method: &str,
        path: &str,
    ) -> Result<Arc<EnrichedOperation>, ScoutError> {
        let entry = self.load(url).await?;
        entry.discovery.find_operation(method, path).ok_or_else(|| {
            LookupError::RouteNotFound {
                method: method.to_uppercase(),
                path: path.to_string(),
            }
            .into()
        })
    }

    /// Validate a request. `options` falls back to the configured defaults.
    pub async fn validate(
        &self,
        url: &str,
        operation_id: &str,
        params: &mut Map<String, Value>,
        body: Option<&Value>,
        options: Option<&ValidationOptions>,
    ) -> Result<ValidationReport, ScoutError> {
        let entry = self.load(url).await?;
        let options = options.copied().unwrap_or(self.options);
        let report = ValidationEngine::new(&entry.discovery).validate_request(
            operation_id,
            params,
            body,
            &options,
        )?;
        Ok(report)
    }

    pub async fn validate_response(
        &self,
        url: &str,
        operation_id: &str,
        status: &str,
        body: Option<&Value>,
    ) -> Result<FieldResult, ScoutError> {
        let entry = self.load(url).await?;
        let result =
            ValidationEngine::new(&entry.discovery).validate_response(operation_id, status, body)?;
        Ok(result)
    }

    /// Drop the cached entry so the next call re-fetches.
    pub fn invalidate(&self, url: &str) -> bool {
        self.cache.invalidate(url)
    }
}
