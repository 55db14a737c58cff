use std::time::Duration;

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistedQueriesConfig {
    /// Accept the `persistedQuery` request extension. A cache must also be given to the
    /// pipeline for persisted queries to be supported.
    pub enabled: bool,
    /// How long a registered query stays in the cache. Forever by default.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub ttl: Option<Duration>,
}

impl Default for PersistedQueriesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: None,
        }
    }
}
