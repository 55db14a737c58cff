use std::sync::Arc;

use super::{Plugin, RequestListener};
use crate::{
    context::{DocumentParsed, OperationResolved, RequestContext, ResponseContext, SourceResolved},
    error::{GraphqlError, GraphqlResult},
    extensions::EndHandler,
};

/// Fans out every hook to the listeners of a request, in plugin registration order.
///
/// Async hooks are awaited one listener after the other and the first error stops the dispatch.
pub(crate) struct Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    listeners: Vec<Box<dyn RequestListener<C>>>,
}

impl<C> Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(plugins: &[Arc<dyn Plugin<C>>], ctx: &RequestContext<C>) -> Self {
        Dispatcher {
            listeners: plugins
                .iter()
                .filter_map(|plugin| plugin.request_did_start(ctx))
                .collect(),
        }
    }

    pub fn parsing_did_start(&mut self, ctx: &SourceResolved<'_, C>) -> EndHandler {
        self.did_start(|listener| listener.parsing_did_start(ctx))
    }

    pub fn validation_did_start(&mut self, ctx: &DocumentParsed<'_, C>) -> EndHandler {
        self.did_start(|listener| listener.validation_did_start(ctx))
    }

    pub fn execution_did_start(&mut self, ctx: &OperationResolved<'_, C>) -> EndHandler {
        self.did_start(|listener| listener.execution_did_start(ctx))
    }

    pub async fn did_resolve_operation(&mut self, ctx: &OperationResolved<'_, C>) -> GraphqlResult<()> {
        for listener in &mut self.listeners {
            listener.did_resolve_operation(ctx).await?;
        }
        Ok(())
    }

    pub async fn will_send_response(&mut self, ctx: &mut ResponseContext<'_, C>) -> GraphqlResult<()> {
        for listener in &mut self.listeners {
            listener.will_send_response(ctx).await?;
        }
        Ok(())
    }

    /// The returned handler ends every listener in registration order.
    fn did_start(&mut self, mut f: impl FnMut(&mut dyn RequestListener<C>) -> Option<EndHandler>) -> EndHandler {
        let handlers = self
            .listeners
            .iter_mut()
            .filter_map(|listener| f(listener.as_mut()))
            .collect::<Vec<_>>();

        Box::new(move |errors: &[GraphqlError]| {
            for handler in handlers {
                handler(errors);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::request::Request;

    type Events = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        fail: bool,
        events: Events,
    }

    impl Plugin<()> for Recorder {
        fn request_did_start(&self, _ctx: &RequestContext<()>) -> Option<Box<dyn RequestListener<()>>> {
            (self.name != "absent").then(|| {
                Box::new(Recorder {
                    name: self.name,
                    fail: self.fail,
                    events: self.events.clone(),
                }) as Box<dyn RequestListener<()>>
            })
        }
    }

    #[async_trait::async_trait]
    impl RequestListener<()> for Recorder {
        fn parsing_did_start(&mut self, _ctx: &SourceResolved<'_, ()>) -> Option<EndHandler> {
            let events = self.events.clone();
            let name = self.name;
            Some(Box::new(move |_: &[GraphqlError]| events.lock().unwrap().push(format!("{name} parsed"))))
        }

        async fn will_send_response(&mut self, _ctx: &mut ResponseContext<'_, ()>) -> GraphqlResult<()> {
            self.events.lock().unwrap().push(format!("{} sending", self.name));
            if self.fail {
                return Err(GraphqlError::internal_server_error());
            }
            Ok(())
        }
    }

    fn plugins(events: &Events, specs: &[(&'static str, bool)]) -> Vec<Arc<dyn Plugin<()>>> {
        specs
            .iter()
            .map(|&(name, fail)| {
                Arc::new(Recorder {
                    name,
                    fail,
                    events: events.clone(),
                }) as Arc<dyn Plugin<()>>
            })
            .collect()
    }

    #[test]
    fn end_handlers_run_in_registration_order() {
        let events = Events::default();
        let mut ctx = RequestContext::new(Request::new("{ a }"), ());
        ctx.set_source("hash".into(), "{ a }".into());
        let mut dispatcher = Dispatcher::new(&plugins(&events, &[("a", false), ("absent", false), ("b", false)]), &ctx);

        let end = dispatcher.parsing_did_start(&ctx.source_resolved().unwrap());
        end(&[]);

        assert_eq!(*events.lock().unwrap(), ["a parsed", "b parsed"]);
    }

    #[tokio::test]
    async fn first_failure_stops_the_dispatch() {
        let events = Events::default();
        let mut ctx = RequestContext::new(Request::new("{ a }"), ());
        let mut dispatcher = Dispatcher::new(&plugins(&events, &[("a", true), ("b", false)]), &ctx);

        let result = dispatcher.will_send_response(&mut ctx.response_context()).await;

        assert!(result.is_err());
        assert_eq!(*events.lock().unwrap(), ["a sending"]);
    }
}
