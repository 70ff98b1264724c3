//! Simplified schema representation used for validation and example values.

pub mod coerce;
pub mod convert;
pub mod example;
pub mod model;
pub mod validate;

pub use coerce::coerce_value;
pub use convert::SchemaConverter;
pub use example::example_value;
pub use model::{Additional, Pattern, SchemaInfo, SchemaNode};
pub use validate::{IssueKind, SchemaValidator, ValidationIssue};
