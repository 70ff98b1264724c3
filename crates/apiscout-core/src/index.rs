use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::discovery::{EnrichedOperation, operation_key};

/// Bucket for operations that declare no tags.
pub const UNTAGGED: &str = "untagged";

/// Constant-time lookups over a fixed operation list.
///
/// Built once from a complete list; never patched.
#[derive(Debug, Default)]
pub struct OperationIndex {
    operations: Vec<Arc<EnrichedOperation>>,
    by_key: HashMap<String, Arc<EnrichedOperation>>,
    by_tag: HashMap<String, Vec<Arc<EnrichedOperation>>>,
}

impl OperationIndex {
    pub fn build(operations: &[Arc<EnrichedOperation>]) -> Self {
        let mut by_key = HashMap::with_capacity(operations.len());
        let mut by_tag: HashMap<String, Vec<Arc<EnrichedOperation>>> = HashMap::new();
        for op in operations {
            by_key.insert(op.key(), Arc::clone(op));
            if op.tags.is_empty() {
                by_tag
                    .entry(UNTAGGED.to_string())
                    .or_default()
                    .push(Arc::clone(op));
            }
            for tag in &op.tags {
                by_tag.entry(tag.clone()).or_default().push(Arc::clone(op));
            }
        }
        debug!(
            "indexed {} operations under {} tags",
            by_key.len(),
            by_tag.len()
        );
        Self {
            operations: operations.to_vec(),
            by_key,
            by_tag,
        }
    }

    /// Exact match on verb (any case) and declared path template. No path
    /// parameter matching is attempted.
    pub fn get(&self, method: &str, path: &str) -> Option<Arc<EnrichedOperation>> {
        self.by_key.get(&operation_key(method, path)).cloned()
    }

    pub fn contains(&self, method: &str, path: &str) -> bool {
        self.by_key.contains_key(&operation_key(method, path))
    }

    /// Operations carrying `tag`; [`UNTAGGED`] selects the ones with none.
    pub fn by_tag(&self, tag: &str) -> Vec<Arc<EnrichedOperation>> {
        self.by_tag.get(tag).cloned().unwrap_or_default()
    }

    /// Operations whose path template starts with `prefix`.
    pub fn by_prefix(&self, prefix: &str) -> Vec<Arc<EnrichedOperation>> {
        self.operations
            .iter()
            .filter(|op| op.path.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn deprecated(&self) -> Vec<Arc<EnrichedOperation>> {
        self.operations
            .iter()
            .filter(|op| op.deprecated)
            .cloned()
            .collect()
    }

    /// Tag names, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.by_tag.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
