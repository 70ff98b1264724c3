//! Enumeration and enrichment of the operations a document declares.

pub mod extract;
pub mod guidance;
pub mod model;

use std::sync::{Arc, OnceLock};

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::error::ResolveError;
use crate::index::OperationIndex;
use crate::parse::document::Document;
use crate::parse::ref_resolve::RefResolver;
use crate::schema::SchemaConverter;

pub use model::{
    AuthSource, DiscoverySummary, EnrichedOperation, ExampleInfo, Guidance, HeaderInfo,
    OperationExample, ParameterInfo, RequestBodyInfo, ResponseInfo, operation_key,
};

/// Lazily enumerated, immutable operation catalog for one document.
///
/// The operation list and the index over it are each built at most once.
#[derive(Debug)]
pub struct OperationDiscovery {
    document: Document,
    operations: OnceLock<Vec<Arc<EnrichedOperation>>>,
    index: OnceLock<OperationIndex>,
}

impl OperationDiscovery {
    /// Resolve the document's references and prepare it for enumeration.
    pub fn new(document: &Document) -> Result<Self, ResolveError> {
        let resolved = RefResolver::new(document).resolve_document(document)?;
        Ok(Self {
            document: resolved,
            operations: OnceLock::new(),
            index: OnceLock::new(),
        })
    }

    /// The reference-resolved document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Every declared path × verb, in document order.
    pub fn operations(&self) -> &[Arc<EnrichedOperation>] {
        self.operations.get_or_init(|| {
            let doc = &self.document;
            let mut schemas = SchemaConverter::new();
            let mut ops = Vec::new();
            for (path, item) in &doc.paths {
                for (method, op) in item.operations() {
                    ops.push(Arc::new(extract::enrich(
                        doc,
                        path,
                        item,
                        method,
                        op,
                        &mut schemas,
                    )));
                }
            }
            debug!(
                "enumerated {} operations ({} distinct schemas) for {}",
                ops.len(),
                schemas.len(),
                doc.info.title
            );
            ops
        })
    }

    pub fn index(&self) -> &OperationIndex {
        self.index
            .get_or_init(|| OperationIndex::build(self.operations()))
    }

    /// Exact lookup by verb and declared path template.
    pub fn find_operation(&self, method: &str, path: &str) -> Option<Arc<EnrichedOperation>> {
        self.index().get(method, path)
    }

    /// Look up by declared `operationId`, falling back to the derived display id.
    pub fn find_by_id(&self, id: &str) -> Option<Arc<EnrichedOperation>> {
        let ops = self.operations();
        ops.iter()
            .find(|op| op.operation_id.as_deref() == Some(id))
            .or_else(|| ops.iter().find(|op| op.display_id == id))
            .cloned()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<Arc<EnrichedOperation>> {
        self.index().by_tag(tag)
    }

    /// Operations whose path template contains `fragment`.
    pub fn find_by_path(&self, fragment: &str) -> Vec<Arc<EnrichedOperation>> {
        self.operations()
            .iter()
            .filter(|op| op.path.contains(fragment))
            .cloned()
            .collect()
    }

    /// `METHOD /path` → operation, in document order.
    pub fn path_map(&self) -> IndexMap<String, Arc<EnrichedOperation>> {
        self.operations()
            .iter()
            .map(|op| (op.key(), Arc::clone(op)))
            .collect()
    }

    /// Scheme name → one-line description.
    pub fn security_schemes(&self) -> IndexMap<String, String> {
        self.document
            .components
            .as_ref()
            .map(|c| {
                c.security_schemes
                    .iter()
                    .map(|(name, scheme)| (name.clone(), scheme.summary()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn server_urls(&self) -> Vec<String> {
        self.document
            .servers
            .iter()
            .map(|s| s.expanded_url())
            .collect()
    }

    /// Declared tags first, then tags only seen on operations.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: IndexSet<String> =
            self.document.tags.iter().map(|t| t.name.clone()).collect();
        for op in self.operations() {
            tags.extend(op.tags.iter().cloned());
        }
        tags.into_iter().collect()
    }

    pub fn summary(&self) -> DiscoverySummary {
        let info = &self.document.info;
        let operations: Vec<EnrichedOperation> =
            self.operations().iter().map(|op| op.as_ref().clone()).collect();
        let server_urls = self.server_urls();
        let security_schemes = self.security_schemes();
        let guidance = api_guidance(
            &info.title,
            operations.len(),
            &server_urls,
            &security_schemes,
        );
        DiscoverySummary {
            title: info.title.clone(),
            version: info.version.clone(),
            description: info.description.clone(),
            server_urls,
            security_schemes,
            tags: self.tags(),
            webhooks: self.document.webhooks.keys().cloned().collect(),
            operations,
            guidance,
        }
    }
}

fn api_guidance(
    title: &str,
    count: usize,
    servers: &[String],
    schemes: &IndexMap<String, String>,
) -> String {
    let mut out = format!("{title} exposes {count} operation{}.", plural(count));
    match servers.first() {
        Some(base) => out.push_str(&format!(" Send requests to {base}.")),
        None => out.push_str(" No server URL is declared; supply the base URL yourself."),
    }
    if !schemes.is_empty() {
        let names: Vec<&str> = schemes.keys().map(String::as_str).collect();
        out.push_str(&format!(
            " Available authentication schemes: {}.",
            names.join(", ")
        ));
    }
    out.push_str(" Validate a request against its operation before sending it.");
    out
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
