use std::sync::Arc;

use runtime::kv::KvStore;

use crate::error::PipelineError;

pub struct DataSourceConfig<'a, C> {
    pub context: &'a C,
    pub cache: Option<&'a KvStore>,
}

/// Request-scoped access to a backing service, handed to resolvers through the execution arguments.
#[async_trait::async_trait]
pub trait DataSource<C>: Send + Sync {
    /// Called once per request, before any other stage runs.
    async fn initialize(&self, config: DataSourceConfig<'_, C>) -> anyhow::Result<()>;
}

/// Creates the data sources of a request.
pub type DataSourcesFactory<C> = Arc<dyn Fn() -> Vec<(String, Arc<dyn DataSource<C>>)> + Send + Sync>;

pub struct DataSources<C> {
    sources: Vec<(String, Arc<dyn DataSource<C>>)>,
}

impl<C> DataSources<C>
where
    C: Send + Sync + 'static,
{
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DataSource<C>>> {
        self.sources
            .iter()
            .find_map(|(source_name, source)| (source_name == name).then_some(source))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sources.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) async fn initialize(
        factory: &DataSourcesFactory<C>,
        context: &C,
        cache: Option<&KvStore>,
    ) -> Result<Self, PipelineError> {
        let sources = factory();

        for (name, source) in &sources {
            source
                .initialize(DataSourceConfig { context, cache })
                .await
                .map_err(|err| PipelineError::DataSourceInitialization {
                    name: name.clone(),
                    message: err.to_string(),
                })?;
        }

        Ok(DataSources { sources })
    }
}

impl<C> std::fmt::Debug for DataSources<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|(name, _)| name))
            .finish()
    }
}
