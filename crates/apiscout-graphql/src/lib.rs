pub mod cache;
pub mod catalog;
pub mod client;
pub mod error;
pub mod explorer;
pub mod guidance;
pub mod introspection;
pub mod query;

pub use cache::{GraphCache, shared_cache};
pub use catalog::{GraphArgument, GraphCatalog, GraphOperation, TypeSummary};
pub use client::{GraphClient, GraphRequest, GraphResponse, ResponseError};
pub use error::GraphError;
pub use explorer::GraphExplorer;
pub use query::{OperationKind, QueryDocument, parse_query};
