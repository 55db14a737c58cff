//! Extensions observe the stages of a request and may contribute to the `extensions` of the response.

mod cache_control;
mod trace;

use std::sync::Arc;

use async_graphql_parser::{types::OperationDefinition, Positioned};

pub use self::{
    cache_control::{CacheControlExtension, CacheControlExtensionFactory},
    trace::{TracingExtension, TracingExtensionFactory},
};

use crate::{
    engine::ExecutionResult,
    error::GraphqlError,
    request::Variables,
    response::{Response, ResponseExtensions},
};

/// Signals the end of a stage. The errors are empty if the stage succeeded.
pub type EndHandler = Box<dyn FnOnce(&[GraphqlError]) + Send>;

/// Creates a fresh extension for every request.
pub trait ExtensionFactory: Send + Sync + 'static {
    fn create(&self) -> Box<dyn Extension>;
}

pub struct RequestInfo<'a> {
    pub query: &'a str,
    pub query_hash: &'a str,
    pub operation_name: Option<&'a str>,
    pub variables: &'a Variables,
}

pub struct ExecutionInfo<'a> {
    pub operation_name: Option<&'a str>,
    pub operation: &'a Positioned<OperationDefinition>,
}

#[allow(unused_variables)]
pub trait Extension: Send {
    /// Key under which `format` output is published in the response extensions.
    fn name(&self) -> &'static str;

    fn request_did_start(&mut self, info: &RequestInfo<'_>) -> Option<EndHandler> {
        None
    }

    fn parsing_did_start(&mut self, info: &RequestInfo<'_>) -> Option<EndHandler> {
        None
    }

    fn validation_did_start(&mut self) -> Option<EndHandler> {
        None
    }

    fn execution_did_start(&mut self, info: &ExecutionInfo<'_>) -> Option<EndHandler> {
        None
    }

    /// Called with the initial result once the engine is done.
    fn did_execute(&mut self, result: &ExecutionResult) {}

    /// Called after `did_execute` when the rest of the response streams as patches.
    fn did_defer(&mut self) {}

    fn will_send_response(&mut self, response: &mut Response) {}

    fn format(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Extensions of a single request, called in registration order.
pub(crate) struct ExtensionStack {
    extensions: Vec<Box<dyn Extension>>,
}

impl ExtensionStack {
    pub fn new(factories: &[Arc<dyn ExtensionFactory>]) -> Self {
        ExtensionStack {
            extensions: factories.iter().map(|factory| factory.create()).collect(),
        }
    }

    pub fn request_did_start(&mut self, info: &RequestInfo<'_>) -> EndHandler {
        self.did_start(|extension| extension.request_did_start(info))
    }

    pub fn parsing_did_start(&mut self, info: &RequestInfo<'_>) -> EndHandler {
        self.did_start(|extension| extension.parsing_did_start(info))
    }

    pub fn validation_did_start(&mut self) -> EndHandler {
        self.did_start(|extension| extension.validation_did_start())
    }

    pub fn execution_did_start(&mut self, info: &ExecutionInfo<'_>) -> EndHandler {
        self.did_start(|extension| extension.execution_did_start(info))
    }

    pub fn did_execute(&mut self, result: &ExecutionResult) {
        for extension in &mut self.extensions {
            extension.did_execute(result);
        }
    }

    pub fn did_defer(&mut self) {
        for extension in &mut self.extensions {
            extension.did_defer();
        }
    }

    pub fn will_send_response(&mut self, response: &mut Response) {
        for extension in &mut self.extensions {
            extension.will_send_response(response);
        }
    }

    pub fn format(&self) -> ResponseExtensions {
        self.extensions
            .iter()
            .filter_map(|extension| Some((extension.name().to_string(), extension.format()?)))
            .collect()
    }

    /// End handlers run in reverse order, the first extension started is the last one to end.
    fn did_start(&mut self, mut f: impl FnMut(&mut dyn Extension) -> Option<EndHandler>) -> EndHandler {
        let handlers = self
            .extensions
            .iter_mut()
            .filter_map(|extension| f(extension.as_mut()))
            .collect::<Vec<_>>();

        Box::new(move |errors: &[GraphqlError]| {
            for handler in handlers.into_iter().rev() {
                handler(errors);
            }
        })
    }
}
