#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_graphql_parser::{
    types::{Directive, ExecutableDocument, OperationDefinition, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::{ConstValue, Value as InputValue};
use futures_util::StreamExt;
use request_pipeline::{
    extensions::{EndHandler, Extension, ExtensionFactory, RequestInfo},
    plugins::{Plugin, RequestListener},
    DeferredExecutionResult, DocumentParsed, ErrorCode, ExecutionArgs, ExecutionOutcome, ExecutionPatch,
    ExecutionResult, GraphqlError, GraphqlResult, OperationResolved, Pipeline, PipelineBuilder, QueryEngine,
    Request, RequestContext, Response, ResponseContext, SourceResolved, StaticSchema, Variables,
};
use serde_json::{json, Map, Value};

pub fn schema() -> StaticSchema {
    StaticSchema::new("Query")
        .with_mutation("Mutation")
        .with_field("Query", "me", "User!")
        .with_field("Query", "version", "String!")
        .with_field("Query", "failing", "String")
        .with_field("Mutation", "addUser", "User")
        .with_field("User", "name", "String!")
        .with_field("User", "bio", "String")
        .with_field("User", "friends", "[User!]")
}

pub fn root_value() -> Value {
    json!({
        "me": {
            "name": "Ada",
            "bio": "Mathematician",
            "friends": [
                {"name": "Charles", "bio": null}
            ]
        },
        "version": "1.0",
        "addUser": {"name": "Grace", "bio": null, "friends": []}
    })
}

/// Resolves selections straight out of the root value. Every enabled `@defer` becomes a patch.
#[derive(Clone, Default)]
pub struct TestEngine {
    executions: Arc<AtomicUsize>,
}

impl TestEngine {
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

pub fn builder(engine: TestEngine) -> PipelineBuilder<()> {
    Pipeline::builder(engine, schema()).root_value(root_value())
}

pub fn pipeline() -> Pipeline<()> {
    builder(TestEngine::default()).build()
}

/// Runs a request expected to produce a complete response.
pub async fn execute(pipeline: &Pipeline<()>, request: Request) -> Response {
    let mut ctx = RequestContext::new(request, ());
    pipeline
        .execute(&mut ctx)
        .await
        .unwrap()
        .into_complete()
        .expect("complete response")
}

#[async_trait::async_trait]
impl<C> QueryEngine<C> for TestEngine
where
    C: Send + Sync + 'static,
{
    async fn execute(&self, args: ExecutionArgs<'_, C>) -> GraphqlResult<ExecutionOutcome> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        let root = args.root_value.cloned().unwrap_or(Value::Null);
        let mut resolver = Resolver {
            document: &args.document,
            operation: &args.operation.node,
            variables: args.variables,
            patches: Vec::new(),
            errors: Vec::new(),
        };
        let data = resolver.resolve_selection_set(&args.operation.node.selection_set.node, &root, &[]);

        let initial_result = ExecutionResult {
            data: Some(Value::Object(data)),
            errors: resolver.errors,
            ..Default::default()
        };

        if resolver.patches.is_empty() {
            return Ok(initial_result.into());
        }

        Ok(ExecutionOutcome::Deferred(DeferredExecutionResult {
            initial_result,
            deferred_patches: futures_util::stream::iter(resolver.patches).boxed(),
        }))
    }
}

struct Resolver<'a> {
    document: &'a ExecutableDocument,
    operation: &'a OperationDefinition,
    variables: &'a Variables,
    patches: Vec<ExecutionPatch>,
    errors: Vec<GraphqlError>,
}

impl Resolver<'_> {
    fn resolve_selection_set(
        &mut self,
        selection_set: &SelectionSet,
        value: &Value,
        path: &[request_pipeline::PathSegment],
    ) -> Map<String, Value> {
        let mut object = Map::new();

        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    let field = &field.node;
                    let key = field.response_key().node.to_string();
                    let name = field.name.node.as_str();

                    let mut field_path = path.to_vec();
                    field_path.push(key.clone().into());

                    let resolved = if name == "failing" {
                        self.errors.push(
                            GraphqlError::new("Field failed", ErrorCode::Custom("FIELD_ERROR".into()))
                                .with_path(field_path),
                        );
                        Value::Null
                    } else {
                        let child = value.get(name).cloned().unwrap_or(Value::Null);
                        self.resolve_value(&field.selection_set.node, child, &field_path)
                    };

                    if self.is_deferred(&field.directives) {
                        let mut data = Map::new();
                        data.insert(key, resolved);
                        self.patches.push(ExecutionPatch::new(path.to_vec(), Value::Object(data)));
                    } else {
                        object.insert(key, resolved);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if let Some(fragment) = self.document.fragments.get(&spread.node.fragment_name.node) {
                        let resolved = self.resolve_selection_set(&fragment.node.selection_set.node, value, path);
                        object.extend(resolved);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    let resolved = self.resolve_selection_set(&fragment.node.selection_set.node, value, path);
                    if self.is_deferred(&fragment.node.directives) {
                        self.patches
                            .push(ExecutionPatch::new(path.to_vec(), Value::Object(resolved)));
                    } else {
                        object.extend(resolved);
                    }
                }
            }
        }

        object
    }

    fn resolve_value(
        &mut self,
        selection_set: &SelectionSet,
        value: Value,
        path: &[request_pipeline::PathSegment],
    ) -> Value {
        if selection_set.items.is_empty() {
            return value;
        }

        match value {
            Value::Object(_) => Value::Object(self.resolve_selection_set(selection_set, &value, path)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let mut item_path = path.to_vec();
                        item_path.push(index.into());
                        self.resolve_value(selection_set, item, &item_path)
                    })
                    .collect(),
            ),
            value => value,
        }
    }

    fn is_deferred(&self, directives: &[Positioned<Directive>]) -> bool {
        let Some(defer) = directives
            .iter()
            .find(|directive| directive.node.name.node.as_str() == "defer")
        else {
            return false;
        };

        match defer.node.get_argument("if").map(|condition| &condition.node) {
            Some(InputValue::Boolean(enabled)) => *enabled,
            Some(InputValue::Variable(name)) => self.variable(name.as_str()).unwrap_or(true),
            _ => true,
        }
    }

    fn variable(&self, name: &str) -> Option<bool> {
        if let Some(value) = self.variables.get(name) {
            return value.as_bool();
        }

        let definition = self
            .operation
            .variable_definitions
            .iter()
            .find(|definition| definition.node.name.node.as_str() == name)?;

        match &definition.node.default_value.as_ref()?.node {
            ConstValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// Shared log of hook calls.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn end_handler(&self, event: String) -> Option<EndHandler> {
        let recorder = self.clone();
        Some(Box::new(move |errors: &[GraphqlError]| {
            if errors.is_empty() {
                recorder.record(event);
            } else {
                recorder.record(format!("{event} ({} errors)", errors.len()));
            }
        }))
    }
}

#[derive(Clone, Default)]
pub struct RecordingPlugin {
    pub name: &'static str,
    pub recorder: Recorder,
    pub fail_on_resolve: bool,
    pub fail_on_send: bool,
    /// Makes `did_resolve_operation` yield before completing.
    pub resolve_delay: Option<Duration>,
}

impl RecordingPlugin {
    pub fn new(name: &'static str, recorder: &Recorder) -> Self {
        RecordingPlugin {
            name,
            recorder: recorder.clone(),
            ..Default::default()
        }
    }
}

impl<C> Plugin<C> for RecordingPlugin
where
    C: Send + Sync + 'static,
{
    fn request_did_start(&self, _ctx: &RequestContext<C>) -> Option<Box<dyn RequestListener<C>>> {
        self.recorder.record(format!("{}: request", self.name));
        Some(Box::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl<C> RequestListener<C> for RecordingPlugin
where
    C: Send + Sync + 'static,
{
    fn parsing_did_start(&mut self, _ctx: &SourceResolved<'_, C>) -> Option<EndHandler> {
        self.recorder.record(format!("{}: parsing start", self.name));
        self.recorder.end_handler(format!("{}: parsing end", self.name))
    }

    fn validation_did_start(&mut self, _ctx: &DocumentParsed<'_, C>) -> Option<EndHandler> {
        self.recorder.record(format!("{}: validation start", self.name));
        self.recorder.end_handler(format!("{}: validation end", self.name))
    }

    fn execution_did_start(&mut self, _ctx: &OperationResolved<'_, C>) -> Option<EndHandler> {
        self.recorder.record(format!("{}: execution start", self.name));
        self.recorder.end_handler(format!("{}: execution end", self.name))
    }

    async fn did_resolve_operation(&mut self, _ctx: &OperationResolved<'_, C>) -> GraphqlResult<()> {
        self.recorder.record(format!("{}: resolve operation start", self.name));
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }
        self.recorder.record(format!("{}: resolve operation end", self.name));

        if self.fail_on_resolve {
            return Err(GraphqlError::new(
                "Operation rejected",
                ErrorCode::Custom("UNAUTHORIZED".into()),
            ));
        }
        Ok(())
    }

    async fn will_send_response(&mut self, ctx: &mut ResponseContext<'_, C>) -> GraphqlResult<()> {
        self.recorder.record(format!("{}: will send response", self.name));

        if self.fail_on_send {
            return Err(GraphqlError::internal_server_error());
        }

        ctx.response
            .http
            .headers
            .insert("x-plugin", http::HeaderValue::from_static(self.name));
        Ok(())
    }
}

pub struct RecordingExtensionFactory {
    pub name: &'static str,
    pub recorder: Recorder,
}

impl RecordingExtensionFactory {
    pub fn new(name: &'static str, recorder: &Recorder) -> Self {
        RecordingExtensionFactory {
            name,
            recorder: recorder.clone(),
        }
    }
}

impl ExtensionFactory for RecordingExtensionFactory {
    fn create(&self) -> Box<dyn Extension> {
        Box::new(RecordingExtension {
            name: self.name,
            recorder: self.recorder.clone(),
            query_hash: None,
        })
    }
}

struct RecordingExtension {
    name: &'static str,
    recorder: Recorder,
    query_hash: Option<String>,
}

impl Extension for RecordingExtension {
    fn name(&self) -> &'static str {
        self.name
    }

    fn request_did_start(&mut self, info: &RequestInfo<'_>) -> Option<EndHandler> {
        self.query_hash = Some(info.query_hash.to_string());
        self.recorder.record(format!("{}: request start", self.name));
        self.recorder.end_handler(format!("{}: request end", self.name))
    }

    fn parsing_did_start(&mut self, _info: &RequestInfo<'_>) -> Option<EndHandler> {
        self.recorder.record(format!("{}: parsing start", self.name));
        self.recorder.end_handler(format!("{}: parsing end", self.name))
    }

    fn validation_did_start(&mut self) -> Option<EndHandler> {
        self.recorder.record(format!("{}: validation start", self.name));
        self.recorder.end_handler(format!("{}: validation end", self.name))
    }

    fn execution_did_start(&mut self, _info: &request_pipeline::extensions::ExecutionInfo<'_>) -> Option<EndHandler> {
        self.recorder.record(format!("{}: execution start", self.name));
        self.recorder.end_handler(format!("{}: execution end", self.name))
    }

    fn did_execute(&mut self, _result: &ExecutionResult) {
        self.recorder.record(format!("{}: did execute", self.name));
    }

    fn format(&self) -> Option<Value> {
        Some(json!({ "queryHash": self.query_hash }))
    }
}
