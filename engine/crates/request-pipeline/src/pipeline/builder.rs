use std::sync::Arc;

use pipeline_config::PipelineConfig;
use runtime::{
    background::{BackgroundTasks, BackgroundTasksHandle},
    kv::KvStore,
};
use runtime_local::{InMemoryKvStore, TokioBackgroundTasks};

use super::Pipeline;
use crate::{
    data_sources::{DataSource, DataSourcesFactory},
    document_store::DocumentStore,
    engine::QueryEngine,
    error::GraphqlError,
    extensions::{CacheControlExtensionFactory, ExtensionFactory, TracingExtensionFactory},
    format::{ErrorFormatter, FormatContext, FormatErrorFn, FormatResponseFn},
    persisted_query::PersistedQueries,
    plugins::Plugin,
    response::Response,
    schema::Schema,
    validation::{CannotDeferNonNullableFields, ValidationRule},
};

/// Pipeline builder
pub struct PipelineBuilder<C>
where
    C: Send + Sync + 'static,
{
    engine: Arc<dyn QueryEngine<C>>,
    schema: Arc<dyn Schema>,
    config: PipelineConfig,
    cache: Option<KvStore>,
    persisted_query_cache: Option<KvStore>,
    background_tasks: Option<BackgroundTasksHandle>,
    plugins: Vec<Arc<dyn Plugin<C>>>,
    extensions: Vec<Arc<dyn ExtensionFactory>>,
    validation_rules: Vec<Arc<dyn ValidationRule>>,
    format_error: Option<FormatErrorFn>,
    format_response: Option<FormatResponseFn<C>>,
    data_sources: Option<DataSourcesFactory<C>>,
    root_value: Option<serde_json::Value>,
}

impl<C> Pipeline<C>
where
    C: Send + Sync + 'static,
{
    pub fn builder(engine: impl QueryEngine<C> + 'static, schema: impl Schema + 'static) -> PipelineBuilder<C> {
        PipelineBuilder {
            engine: Arc::new(engine),
            schema: Arc::new(schema),
            config: PipelineConfig::default(),
            cache: None,
            persisted_query_cache: None,
            background_tasks: None,
            plugins: Vec::new(),
            extensions: Vec::new(),
            validation_rules: Vec::new(),
            format_error: None,
            format_response: None,
            data_sources: None,
            root_value: None,
        }
    }
}

impl<C> PipelineBuilder<C>
where
    C: Send + Sync + 'static,
{
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Request-scoped cache shared with data sources. Defaults to an in-memory store.
    #[must_use]
    pub fn cache(mut self, cache: KvStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Store of persisted queries. Defaults to the general cache.
    #[must_use]
    pub fn persisted_query_cache(mut self, cache: KvStore) -> Self {
        self.persisted_query_cache = Some(cache);
        self
    }

    /// Where persisted query registrations run. Defaults to spawning on the current tokio runtime.
    #[must_use]
    pub fn background_tasks(mut self, background_tasks: impl BackgroundTasks + 'static) -> Self {
        self.background_tasks = Some(BackgroundTasksHandle::new(background_tasks));
        self
    }

    /// Plugins are notified in the order they were added.
    #[must_use]
    pub fn plugin(mut self, plugin: impl Plugin<C>) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Extensions are called in the order they were added, before the built-in ones.
    #[must_use]
    pub fn extension(mut self, extension: impl ExtensionFactory) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Additional rule, run after the built-in ones.
    #[must_use]
    pub fn validation_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.validation_rules.push(Arc::new(rule));
        self
    }

    #[must_use]
    pub fn format_error(mut self, format_error: impl Fn(GraphqlError) -> GraphqlError + Send + Sync + 'static) -> Self {
        self.format_error = Some(Arc::new(format_error));
        self
    }

    #[must_use]
    pub fn format_response(
        mut self,
        format_response: impl Fn(Response, &FormatContext<'_, C>) -> Response + Send + Sync + 'static,
    ) -> Self {
        self.format_response = Some(Arc::new(format_response));
        self
    }

    /// Creates the data sources of each request. Requests must not carry data sources of their own.
    #[must_use]
    pub fn data_sources(
        mut self,
        factory: impl Fn() -> Vec<(String, Arc<dyn DataSource<C>>)> + Send + Sync + 'static,
    ) -> Self {
        self.data_sources = Some(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn root_value(mut self, root_value: serde_json::Value) -> Self {
        self.root_value = Some(root_value);
        self
    }

    pub fn build(self) -> Pipeline<C> {
        let PipelineBuilder {
            engine,
            schema,
            config,
            cache,
            persisted_query_cache,
            background_tasks,
            plugins,
            mut extensions,
            validation_rules: custom_rules,
            format_error,
            format_response,
            data_sources,
            root_value,
        } = self;

        let cache = cache.unwrap_or_else(|| KvStore::new(InMemoryKvStore::new()));

        let persisted_queries = PersistedQueries::new(
            config
                .persisted_queries
                .enabled
                .then(|| persisted_query_cache.unwrap_or_else(|| cache.clone())),
            config.persisted_queries.ttl,
        );

        if config.tracing.enabled {
            extensions.push(Arc::new(TracingExtensionFactory));
        }
        if let Some(cache_control) = &config.cache_control {
            extensions.push(Arc::new(CacheControlExtensionFactory::new(cache_control.clone())));
        }

        let mut validation_rules: Vec<Arc<dyn ValidationRule>> = vec![Arc::new(CannotDeferNonNullableFields)];
        validation_rules.extend(custom_rules);

        let document_store = config
            .document_cache
            .enabled
            .then(|| DocumentStore::new(config.document_cache.limit));

        Pipeline {
            engine,
            schema,
            persisted_queries,
            cache,
            background_tasks: background_tasks.unwrap_or_else(|| BackgroundTasksHandle::new(TokioBackgroundTasks)),
            plugins,
            extensions,
            validation_rules,
            error_formatter: ErrorFormatter::new(config.debug, format_error),
            format_response,
            data_sources,
            root_value,
            document_store,
            config,
        }
    }
}
