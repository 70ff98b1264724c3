pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod explorer;
pub mod fetch;
pub mod index;
pub mod naming;
pub mod parse;
pub mod schema;
pub mod validate;

pub use cache::{CacheStats, SpecCache, SpecEntry, TtlCache};
pub use config::ScoutConfig;
pub use discovery::{DiscoverySummary, EnrichedOperation, OperationDiscovery};
pub use error::ScoutError;
pub use explorer::ApiExplorer;
pub use index::OperationIndex;
pub use validate::{ValidationEngine, ValidationOptions, ValidationReport};
