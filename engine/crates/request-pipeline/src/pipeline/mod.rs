mod builder;
mod operation;

use std::sync::Arc;

use async_graphql_parser::types::{ExecutableDocument, OperationType};
use futures_util::StreamExt;
use pipeline_config::PipelineConfig;
use runtime::{background::BackgroundTasksHandle, kv::KvStore};
use tracing::{field::Empty, info_span, Instrument};
use web_time::Instant;

pub use builder::PipelineBuilder;

use crate::{
    context::RequestContext,
    data_sources::{DataSources, DataSourcesFactory},
    defer,
    document_store::DocumentStore,
    engine::{DeferredExecutionResult, ExecutionArgs, ExecutionOutcome, ExecutionResult, QueryEngine},
    error::{GraphqlError, PipelineError},
    extensions::{EndHandler, ExtensionFactory},
    format::{ErrorFormatter, FormatResponseFn},
    instrumentation::Instrumentation,
    persisted_query::{PersistedQueries, Registration},
    plugins::Plugin,
    response::{DeferredPatches, DeferredResponse, PipelineResponse, Response},
    schema::Schema,
    validation::ValidationRule,
};

type StageResult<T> = Result<T, Vec<GraphqlError>>;

/// Drives a request through query resolution, parsing, validation, operation resolution and execution.
///
/// A failing stage short-circuits the remaining ones. Success or failure, every response goes
/// through the same formatting and the same `will_send_response` hooks.
pub struct Pipeline<C>
where
    C: Send + Sync + 'static,
{
    engine: Arc<dyn QueryEngine<C>>,
    schema: Arc<dyn Schema>,
    config: PipelineConfig,
    persisted_queries: PersistedQueries,
    cache: KvStore,
    background_tasks: BackgroundTasksHandle,
    plugins: Vec<Arc<dyn Plugin<C>>>,
    extensions: Vec<Arc<dyn ExtensionFactory>>,
    validation_rules: Vec<Arc<dyn ValidationRule>>,
    error_formatter: ErrorFormatter,
    format_response: Option<FormatResponseFn<C>>,
    data_sources: Option<DataSourcesFactory<C>>,
    root_value: Option<serde_json::Value>,
    document_store: Option<DocumentStore>,
}

impl<C> Pipeline<C>
where
    C: Send + Sync + 'static,
{
    /// Processes the request held by `ctx`. The response is also left in `ctx.response`.
    ///
    /// Only misconfigurations are returned as errors, request failures are GraphQL responses.
    pub async fn execute(&self, ctx: &mut RequestContext<C>) -> Result<PipelineResponse, PipelineError> {
        let span = info_span!("graphql request", operation_name = Empty, query_hash = Empty);
        self.process(ctx).instrument(span).await
    }

    async fn process(&self, ctx: &mut RequestContext<C>) -> Result<PipelineResponse, PipelineError> {
        if ctx.data_sources.is_some() {
            return Err(PipelineError::DataSourcesAlreadyDefined);
        }

        ctx.metrics.started_at = Instant::now();
        if ctx.cache.is_none() {
            ctx.cache = Some(self.cache.clone());
        }

        if let Some(factory) = &self.data_sources {
            let data_sources = DataSources::initialize(factory, &ctx.context, ctx.cache.as_ref()).await?;
            ctx.data_sources = Some(data_sources);
        }

        let mut instrumentation = Instrumentation::new(&self.plugins, &self.extensions, ctx);

        let resolved = self
            .persisted_queries
            .resolve(&ctx.request)
            .instrument(info_span!("resolve query"))
            .await;

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(error) => {
                let response = self
                    .send_response(ctx, &mut instrumentation, Response::from_error(error))
                    .await;
                return Ok(PipelineResponse::Complete(response));
            }
        };

        tracing::Span::current().record("query_hash", resolved.query_hash.as_str());
        ctx.metrics.persisted_query_hit = resolved.hit;
        ctx.metrics.persisted_query_register = resolved.registration.is_some();
        ctx.set_source(resolved.query_hash, resolved.source);

        let request_end: EndHandler = match ctx.source_resolved() {
            Some(view) => instrumentation.request_did_start(&view),
            None => Box::new(|_: &[GraphqlError]| {}),
        };

        match self.run(ctx, &mut instrumentation, resolved.registration).await {
            Ok(ExecutionOutcome::Complete(result)) => {
                let response = self
                    .send_response(ctx, &mut instrumentation, response_from(result))
                    .await;
                request_end(&response.errors);
                Ok(PipelineResponse::Complete(response))
            }
            Ok(ExecutionOutcome::Deferred(deferred)) => {
                let deferred = self.send_deferred(ctx, &mut instrumentation, deferred, request_end);
                Ok(PipelineResponse::Deferred(deferred))
            }
            Err(errors) => {
                let response = self
                    .send_response(ctx, &mut instrumentation, Response::from_errors(errors))
                    .await;
                request_end(&response.errors);
                Ok(PipelineResponse::Complete(response))
            }
        }
    }

    async fn run(
        &self,
        ctx: &mut RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
        registration: Option<Registration>,
    ) -> StageResult<ExecutionOutcome> {
        let cached = self
            .document_store
            .as_ref()
            .zip(ctx.query_hash())
            .and_then(|(store, query_hash)| store.get(query_hash));

        let cache_hit = cached.is_some();
        let document = match cached {
            Some(document) => document,
            None => self.parse(ctx, instrumentation).await?,
        };
        ctx.metrics.document_cache_hit = cache_hit;
        ctx.set_document(document.clone());

        // Rules may depend on the variables, cached documents are validated again.
        self.validate(ctx, instrumentation).await?;

        if !cache_hit {
            if let Some((store, query_hash)) = self.document_store.as_ref().zip(ctx.query_hash()) {
                store.insert(query_hash.to_string(), document.clone());
            }
        }

        // Only documents that passed validation get registered.
        if let Some(registration) = registration {
            registration.schedule(&self.background_tasks);
        }

        self.resolve_operation(ctx, instrumentation, &document).await?;

        self.execute_operation(ctx, instrumentation, document).await
    }

    async fn parse(
        &self,
        ctx: &RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
    ) -> StageResult<Arc<ExecutableDocument>> {
        let view = stage_view(ctx.source_resolved())?;
        let stage = instrumentation.parsing_did_start(&view);

        match self.engine.parse(view.source()).instrument(info_span!("parse")).await {
            Ok(document) => {
                stage.end(&[]);
                Ok(Arc::new(document))
            }
            Err(error) => {
                let errors = vec![error];
                stage.end(&errors);
                Err(errors)
            }
        }
    }

    async fn validate(&self, ctx: &RequestContext<C>, instrumentation: &mut Instrumentation<C>) -> StageResult<()> {
        let view = stage_view(ctx.document_parsed())?;
        let stage = instrumentation.validation_did_start(&view);

        let errors = self
            .engine
            .validate(
                self.schema.as_ref(),
                view.document(),
                &view.request.variables,
                &self.validation_rules,
            )
            .instrument(info_span!("validate"))
            .await;

        stage.end(&errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    async fn resolve_operation(
        &self,
        ctx: &mut RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
        document: &ExecutableDocument,
    ) -> StageResult<()> {
        let (operation_name, operation) =
            operation::select_operation(document, ctx.request.operation_name()).map_err(|error| vec![error])?;

        if let Some(name) = &operation_name {
            tracing::Span::current().record("operation_name", name.as_str());
        }

        if ctx.request.http.method == http::Method::GET && operation.node.ty != OperationType::Query {
            ctx.response.http.status = Some(http::StatusCode::METHOD_NOT_ALLOWED);
            return Err(vec![GraphqlError::bad_request(
                "GET requests only support query operations",
            )]);
        }

        ctx.set_operation(operation_name, Arc::new(operation));

        let view = stage_view(ctx.operation_resolved())?;
        instrumentation
            .did_resolve_operation(&view)
            .instrument(info_span!("resolve operation"))
            .await
            .map_err(|error| {
                tracing::debug!("did_resolve_operation hook failed: {error}");
                vec![error]
            })
    }

    async fn execute_operation(
        &self,
        ctx: &RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
        document: Arc<ExecutableDocument>,
    ) -> StageResult<ExecutionOutcome> {
        let view = stage_view(ctx.operation_resolved())?;
        let stage = instrumentation.execution_did_start(&view);

        let args = ExecutionArgs {
            schema: self.schema.as_ref(),
            document,
            operation: view.operation(),
            operation_name: view.operation_name(),
            variables: &view.request.variables,
            root_value: self.root_value.as_ref(),
            context: &view.context,
            data_sources: view.data_sources.as_ref(),
            enable_defer: self.config.defer.enabled,
        };

        let outcome = defer::execute(self.engine.as_ref(), args)
            .instrument(info_span!("execute"))
            .await;

        match outcome {
            Ok(outcome) => {
                let (initial_result, deferred) = match &outcome {
                    ExecutionOutcome::Complete(result) => (result, false),
                    ExecutionOutcome::Deferred(deferred) => (&deferred.initial_result, true),
                };
                stage.end(&initial_result.errors);
                instrumentation.did_execute(initial_result);
                if deferred {
                    instrumentation.did_defer();
                }
                Ok(outcome)
            }
            Err(error) => {
                let errors = vec![error];
                stage.end(&errors);
                Err(errors)
            }
        }
    }

    /// Formats the response and stores it into the request context, other than the body the
    /// context response keeps what it had.
    fn finalize(
        &self,
        ctx: &mut RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
        mut response: Response,
    ) {
        response.extensions.extend(instrumentation.format());
        response.errors = self.error_formatter.format_all(std::mem::take(&mut response.errors));

        if let Some(format_response) = &self.format_response {
            response = format_response(response, &ctx.format_context());
        }

        instrumentation.extensions_will_send_response(&mut response);
        ctx.response.overwrite_body(response);

        // Failed before execution.
        if ctx.response.data.is_none() && ctx.response.has_errors() {
            ctx.response.ensure_error_status();
        }
    }

    async fn send_response(
        &self,
        ctx: &mut RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
        response: Response,
    ) -> Response {
        self.finalize(ctx, instrumentation, response);

        let result = instrumentation
            .listeners_will_send_response(&mut ctx.response_context())
            .await;

        if let Err(error) = result {
            tracing::debug!("will_send_response hook failed: {error}");
            ctx.response
                .overwrite_body(Response::from_error(self.error_formatter.format(error)));
            ctx.response.ensure_error_status();
        }

        ctx.response.clone()
    }

    /// The request ends with the patch stream, not when the initial response is sent.
    fn send_deferred(
        &self,
        ctx: &mut RequestContext<C>,
        instrumentation: &mut Instrumentation<C>,
        deferred: DeferredExecutionResult,
        request_end: EndHandler,
    ) -> DeferredResponse {
        let DeferredExecutionResult {
            initial_result,
            deferred_patches,
        } = deferred;

        self.finalize(ctx, instrumentation, response_from(initial_result));

        let error_formatter = self.error_formatter.clone();
        let deferred_patches = DeferredPatches::new(deferred_patches.map(move |mut patch| {
            patch.errors = error_formatter.format_all(std::mem::take(&mut patch.errors));
            patch
        }))
        .on_request_end(move || request_end(&[]));

        DeferredResponse {
            initial_response: ctx.response.clone(),
            deferred_patches,
        }
    }
}

fn response_from(result: ExecutionResult) -> Response {
    Response {
        data: result.data,
        errors: result.errors,
        ..Default::default()
    }
}

/// Views are always available once the pipeline reached the matching stage.
fn stage_view<T>(view: Option<T>) -> StageResult<T> {
    view.ok_or_else(|| {
        tracing::error!("Request context is missing fields required by the current stage");
        vec![GraphqlError::internal_server_error()]
    })
}
