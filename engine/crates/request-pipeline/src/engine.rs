//! Boundary with the query engine: parsing, validation and field resolution live behind it.

use std::sync::Arc;

use async_graphql_parser::{
    types::{ExecutableDocument, OperationDefinition},
    Positioned,
};
use futures_util::stream::BoxStream;
use serde::Serialize;

use crate::{
    data_sources::DataSources,
    error::{GraphqlError, GraphqlResult},
    request::Variables,
    response::{ExecutionPatch, PathSegment},
    schema::Schema,
    validation::{self, ValidationRule},
};

#[async_trait::async_trait]
pub trait QueryEngine<C>: Send + Sync
where
    C: Send + Sync + 'static,
{
    async fn parse(&self, source: &str) -> GraphqlResult<ExecutableDocument> {
        Ok(async_graphql_parser::parse_query(source)?)
    }

    /// Returns every violation found, an empty list meaning the document is valid. `rules`
    /// comes on top of whatever the engine checks on its own.
    async fn validate(
        &self,
        schema: &dyn Schema,
        document: &ExecutableDocument,
        variables: &Variables,
        rules: &[Arc<dyn ValidationRule>],
    ) -> Vec<GraphqlError> {
        validation::check_rules(schema, document, variables, rules)
    }

    async fn execute(&self, args: ExecutionArgs<'_, C>) -> GraphqlResult<ExecutionOutcome>;
}

pub struct ExecutionArgs<'a, C> {
    pub schema: &'a dyn Schema,
    pub document: Arc<ExecutableDocument>,
    pub operation: &'a Positioned<OperationDefinition>,
    pub operation_name: Option<&'a str>,
    pub variables: &'a Variables,
    pub root_value: Option<&'a serde_json::Value>,
    pub context: &'a C,
    pub data_sources: Option<&'a DataSources<C>>,
    /// Whether the engine may split the result into an initial part and patches.
    pub enable_defer: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub data: Option<serde_json::Value>,
    pub errors: Vec<GraphqlError>,
    /// Cache hints reported by resolvers, consumed by the cache control extension.
    pub cache_hints: Vec<CacheHint>,
}

impl ExecutionResult {
    pub fn from_data(data: serde_json::Value) -> Self {
        ExecutionResult {
            data: Some(data),
            ..Default::default()
        }
    }
}

pub struct DeferredExecutionResult {
    pub initial_result: ExecutionResult,
    pub deferred_patches: BoxStream<'static, ExecutionPatch>,
}

impl std::fmt::Debug for DeferredExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredExecutionResult")
            .field("initial_result", &self.initial_result)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ExecutionOutcome {
    Complete(ExecutionResult),
    Deferred(DeferredExecutionResult),
}

impl From<ExecutionResult> for ExecutionOutcome {
    fn from(result: ExecutionResult) -> Self {
        ExecutionOutcome::Complete(result)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheScope {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHint {
    pub path: Vec<PathSegment>,
    pub max_age: u32,
    pub scope: CacheScope,
}
