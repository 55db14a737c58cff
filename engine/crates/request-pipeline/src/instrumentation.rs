//! Plugin listeners and extensions driven as one.
//!
//! A stage start notifies listeners then extensions, its end notifies extensions then
//! listeners, so both mechanisms nest around the stage.

use std::sync::Arc;

use crate::{
    context::{DocumentParsed, OperationResolved, RequestContext, ResponseContext, SourceResolved},
    engine::ExecutionResult,
    error::{GraphqlError, GraphqlResult},
    extensions::{EndHandler, ExecutionInfo, ExtensionFactory, ExtensionStack, RequestInfo},
    plugins::{Dispatcher, Plugin},
    response::{Response, ResponseExtensions},
};

pub(crate) struct Instrumentation<C>
where
    C: Send + Sync + 'static,
{
    extensions: ExtensionStack,
    dispatcher: Dispatcher<C>,
}

/// End of a stage for both mechanisms.
#[must_use]
pub(crate) struct StageEnd {
    extensions: EndHandler,
    listeners: EndHandler,
}

impl StageEnd {
    pub fn end(self, errors: &[GraphqlError]) {
        (self.extensions)(errors);
        (self.listeners)(errors);
    }
}

fn request_info<'a, C>(ctx: &SourceResolved<'a, C>) -> RequestInfo<'a> {
    let request = &ctx.request_context().request;
    RequestInfo {
        query: ctx.source(),
        query_hash: ctx.query_hash(),
        operation_name: request.operation_name(),
        variables: &request.variables,
    }
}

impl<C> Instrumentation<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(
        plugins: &[Arc<dyn Plugin<C>>],
        extensions: &[Arc<dyn ExtensionFactory>],
        ctx: &RequestContext<C>,
    ) -> Self {
        Instrumentation {
            dispatcher: Dispatcher::new(plugins, ctx),
            extensions: ExtensionStack::new(extensions),
        }
    }

    /// Start of the scope covering the whole request, only observed by extensions.
    pub fn request_did_start(&mut self, ctx: &SourceResolved<'_, C>) -> EndHandler {
        self.extensions.request_did_start(&request_info(ctx))
    }

    pub fn parsing_did_start(&mut self, ctx: &SourceResolved<'_, C>) -> StageEnd {
        let listeners = self.dispatcher.parsing_did_start(ctx);
        let extensions = self.extensions.parsing_did_start(&request_info(ctx));
        StageEnd { extensions, listeners }
    }

    pub fn validation_did_start(&mut self, ctx: &DocumentParsed<'_, C>) -> StageEnd {
        let listeners = self.dispatcher.validation_did_start(ctx);
        let extensions = self.extensions.validation_did_start();
        StageEnd { extensions, listeners }
    }

    pub fn execution_did_start(&mut self, ctx: &OperationResolved<'_, C>) -> StageEnd {
        let listeners = self.dispatcher.execution_did_start(ctx);
        let extensions = self.extensions.execution_did_start(&ExecutionInfo {
            operation_name: ctx.operation_name(),
            operation: ctx.operation(),
        });
        StageEnd { extensions, listeners }
    }

    pub async fn did_resolve_operation(&mut self, ctx: &OperationResolved<'_, C>) -> GraphqlResult<()> {
        self.dispatcher.did_resolve_operation(ctx).await
    }

    pub fn did_execute(&mut self, result: &ExecutionResult) {
        self.extensions.did_execute(result);
    }

    pub fn did_defer(&mut self) {
        self.extensions.did_defer();
    }

    pub fn format(&self) -> ResponseExtensions {
        self.extensions.format()
    }

    pub fn extensions_will_send_response(&mut self, response: &mut Response) {
        self.extensions.will_send_response(response);
    }

    pub async fn listeners_will_send_response(&mut self, ctx: &mut ResponseContext<'_, C>) -> GraphqlResult<()> {
        self.dispatcher.will_send_response(ctx).await
    }
}
