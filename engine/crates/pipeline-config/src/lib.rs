mod cache_control;
mod document_cache;
mod persisted_queries;

pub use cache_control::*;
pub use document_cache::*;
pub use persisted_queries::*;

/// Settings of the request pipeline that can be expressed in a configuration file. Everything
/// that requires code (plugins, extensions, formatters, caches) is given to the pipeline builder
/// directly.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Keep the `exception` extension of errors in responses.
    pub debug: bool,
    /// Automatic persisted queries.
    pub persisted_queries: PersistedQueriesConfig,
    /// `@defer` support.
    pub defer: DeferConfig,
    /// Apollo tracing extension.
    pub tracing: TracingConfig,
    /// Cache control extension, disabled when absent.
    pub cache_control: Option<CacheControlConfig>,
    /// In-memory cache of validated documents keyed by query hash.
    pub document_cache: DocumentCacheConfig,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeferConfig {
    pub enabled: bool,
}

impl Default for DeferConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracingConfig {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use indoc::indoc;

    use super::*;

    #[test]
    fn defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();

        assert!(!config.debug);
        assert!(config.persisted_queries.enabled);
        assert_eq!(None, config.persisted_queries.ttl);
        assert!(config.defer.enabled);
        assert!(!config.tracing.enabled);
        assert_eq!(None, config.cache_control);
        assert!(!config.document_cache.enabled);
        assert_eq!(1000, config.document_cache.limit);
    }

    #[test]
    fn persisted_queries_ttl() {
        let input = indoc! {r#"
            [persisted_queries]
            enabled = true
            ttl = "1h"
        "#};

        let config: PipelineConfig = toml::from_str(input).unwrap();

        assert_eq!(Some(Duration::from_secs(3600)), config.persisted_queries.ttl);
    }

    #[test]
    fn persisted_queries_disabled() {
        let input = indoc! {r#"
            [persisted_queries]
            enabled = false
        "#};

        let config: PipelineConfig = toml::from_str(input).unwrap();

        assert!(!config.persisted_queries.enabled);
    }

    #[test]
    fn cache_control_defaults() {
        let input = indoc! {r#"
            [cache_control]
        "#};

        let config: PipelineConfig = toml::from_str(input).unwrap();

        let expected = CacheControlConfig {
            default_max_age: 0,
            calculate_http_headers: true,
            strip_formatted_extensions: true,
        };

        assert_eq!(Some(expected), config.cache_control);
    }

    #[test]
    fn cache_control_values() {
        let input = indoc! {r#"
            [cache_control]
            default_max_age = 60
            calculate_http_headers = false
            strip_formatted_extensions = false
        "#};

        let config: PipelineConfig = toml::from_str(input).unwrap();
        let cache_control = config.cache_control.unwrap();

        assert_eq!(60, cache_control.default_max_age);
        assert!(!cache_control.calculate_http_headers);
        assert!(!cache_control.strip_formatted_extensions);
    }

    #[test]
    fn document_cache() {
        let input = indoc! {r#"
            [document_cache]
            enabled = true
            limit = 10
        "#};

        let config: PipelineConfig = toml::from_str(input).unwrap();

        assert!(config.document_cache.enabled);
        assert_eq!(10, config.document_cache.limit);
    }

    #[test]
    fn tracing_and_defer() {
        let input = indoc! {r#"
            debug = true

            [tracing]
            enabled = true

            [defer]
            enabled = false
        "#};

        let config: PipelineConfig = toml::from_str(input).unwrap();

        assert!(config.debug);
        assert!(config.tracing.enabled);
        assert!(!config.defer.enabled);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let input = indoc! {r#"
            [defer]
            enabled = true
            stream = true
        "#};

        let error = toml::from_str::<PipelineConfig>(input).unwrap_err();

        assert!(error.to_string().contains("unknown field `stream`"), "{error}");
    }
}
