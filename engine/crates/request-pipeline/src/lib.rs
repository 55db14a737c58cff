//! GraphQL request pipeline.
//!
//! Turns a [`Request`] into a [`PipelineResponse`]: persisted queries are resolved first, then the
//! document is parsed, validated and executed by a [`QueryEngine`]. Plugins and extensions observe
//! every stage. Operations using `@defer` produce an initial response followed by a stream of
//! patches.

mod context;
mod data_sources;
mod defer;
mod document_store;
mod engine;
mod error;
pub mod extensions;
mod format;
mod instrumentation;
mod persisted_query;
mod pipeline;
pub mod plugins;
mod request;
mod response;
mod schema;
pub mod validation;

pub use context::{DocumentParsed, OperationResolved, RequestContext, RequestMetrics, ResponseContext, SourceResolved};
pub use data_sources::{DataSource, DataSourceConfig, DataSources, DataSourcesFactory};
pub use engine::{
    CacheHint, CacheScope, DeferredExecutionResult, ExecutionArgs, ExecutionOutcome, ExecutionResult, QueryEngine,
};
pub use error::{ErrorCode, GraphqlError, GraphqlResult, Location, PipelineError};
pub use format::{FormatContext, FormatErrorFn, FormatResponseFn, EXCEPTION_EXTENSION};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use request::{HttpRequestMetadata, PersistedQueryRequestExtension, Request, RequestExtensions, Variables};
pub use response::{
    DeferredPatches, DeferredResponse, ExecutionPatch, HttpResponseMetadata, PathSegment, PipelineResponse, Response,
    ResponseExtensions,
};
pub use schema::{Schema, StaticSchema};

pub use pipeline_config as config;
