use std::sync::Arc;

use async_graphql_parser::types::ExecutableDocument;

/// Parsed documents keyed by query hash, only stored once they passed validation. A hit skips parsing.
pub(crate) struct DocumentStore {
    inner: mini_moka::sync::Cache<String, Arc<ExecutableDocument>>,
}

impl DocumentStore {
    pub fn new(limit: usize) -> Self {
        DocumentStore {
            inner: mini_moka::sync::Cache::builder().max_capacity(limit as u64).build(),
        }
    }

    pub fn get(&self, query_hash: &str) -> Option<Arc<ExecutableDocument>> {
        self.inner.get(&query_hash.to_owned())
    }

    pub fn insert(&self, query_hash: String, document: Arc<ExecutableDocument>) {
        self.inner.insert(query_hash, document);
    }
}
