#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentCacheConfig {
    /// If validated documents should be cached.
    pub enabled: bool,
    /// The maximum number of documents that can be kept in the cache.
    /// 1000 by default.
    pub limit: usize,
}

impl Default for DocumentCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: 1000,
        }
    }
}
