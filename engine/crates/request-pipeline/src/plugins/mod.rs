//! Plugins get a listener per request and are notified at each stage boundary.

mod dispatcher;

pub(crate) use dispatcher::Dispatcher;

use crate::{
    context::{DocumentParsed, OperationResolved, RequestContext, ResponseContext, SourceResolved},
    error::GraphqlResult,
    extensions::EndHandler,
};

pub trait Plugin<C>: Send + Sync + 'static
where
    C: Send + Sync + 'static,
{
    /// Returns a listener for this request, or `None` to opt out of it.
    fn request_did_start(&self, ctx: &RequestContext<C>) -> Option<Box<dyn RequestListener<C>>>;
}

/// Hooks of a single request. Every hook is optional.
#[allow(unused_variables)]
#[async_trait::async_trait]
pub trait RequestListener<C>: Send
where
    C: Send + Sync + 'static,
{
    fn parsing_did_start(&mut self, ctx: &SourceResolved<'_, C>) -> Option<EndHandler> {
        None
    }

    fn validation_did_start(&mut self, ctx: &DocumentParsed<'_, C>) -> Option<EndHandler> {
        None
    }

    fn execution_did_start(&mut self, ctx: &OperationResolved<'_, C>) -> Option<EndHandler> {
        None
    }

    /// An error aborts the request before execution.
    async fn did_resolve_operation(&mut self, ctx: &OperationResolved<'_, C>) -> GraphqlResult<()> {
        Ok(())
    }

    /// Only called for complete responses.
    async fn will_send_response(&mut self, ctx: &mut ResponseContext<'_, C>) -> GraphqlResult<()> {
        Ok(())
    }
}
