use std::sync::{Arc, OnceLock};

use apiscout_core::TtlCache;
use apiscout_core::config::CacheConfig;
use log::info;

use crate::catalog::GraphCatalog;

/// Endpoint URL → discovered catalog, expiring like the document cache.
pub type GraphCache = TtlCache<Arc<GraphCatalog>>;

static SHARED: OnceLock<Arc<GraphCache>> = OnceLock::new();

/// Process-wide catalog cache with default settings, created on first use.
pub fn shared_cache() -> Arc<GraphCache> {
    Arc::clone(SHARED.get_or_init(|| {
        info!("creating shared graph catalog cache");
        Arc::new(GraphCache::from_config(&CacheConfig::default()))
    }))
}
