use std::{ops::Deref, sync::Arc};

use async_graphql_parser::{
    types::{ExecutableDocument, OperationDefinition},
    Positioned,
};
use runtime::kv::KvStore;
use web_time::Instant;

use crate::{data_sources::DataSources, request::Request, response::Response};

/// State of a single request, filled in as the pipeline progresses.
///
/// The query hash, source, document and operation are set at most once and never cleared.
/// Hooks receive typed views (`SourceResolved`, `DocumentParsed`, `OperationResolved`) that only
/// exist once the matching fields are known.
pub struct RequestContext<C> {
    pub request: Request,
    pub response: Response,
    pub context: C,
    pub cache: Option<KvStore>,
    pub metrics: RequestMetrics,
    /// Populated by the pipeline. Setting it beforehand is a configuration error.
    pub data_sources: Option<DataSources<C>>,
    query_hash: Option<String>,
    source: Option<String>,
    document: Option<Arc<ExecutableDocument>>,
    operation: Option<Arc<Positioned<OperationDefinition>>>,
    operation_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestMetrics {
    pub started_at: Instant,
    pub persisted_query_hit: bool,
    pub persisted_query_register: bool,
    pub document_cache_hit: bool,
}

impl Default for RequestMetrics {
    fn default() -> Self {
        RequestMetrics {
            started_at: Instant::now(),
            persisted_query_hit: false,
            persisted_query_register: false,
            document_cache_hit: false,
        }
    }
}

impl<C> RequestContext<C> {
    pub fn new(request: Request, context: C) -> Self {
        RequestContext {
            request,
            response: Response::default(),
            context,
            cache: None,
            metrics: RequestMetrics::default(),
            data_sources: None,
            query_hash: None,
            source: None,
            document: None,
            operation: None,
            operation_name: None,
        }
    }

    pub fn query_hash(&self) -> Option<&str> {
        self.query_hash.as_deref()
    }

    /// Query text, after persisted queries were resolved.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn document(&self) -> Option<&ExecutableDocument> {
        self.document.as_deref()
    }

    pub fn operation(&self) -> Option<&Positioned<OperationDefinition>> {
        self.operation.as_deref()
    }

    /// `None` for anonymous operations or before the operation is resolved.
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    pub(crate) fn set_source(&mut self, query_hash: String, source: String) {
        if self.query_hash.is_none() {
            self.query_hash = Some(query_hash);
            self.source = Some(source);
        }
    }

    pub(crate) fn set_document(&mut self, document: Arc<ExecutableDocument>) {
        self.document.get_or_insert(document);
    }

    pub(crate) fn set_operation(&mut self, name: Option<String>, operation: Arc<Positioned<OperationDefinition>>) {
        if self.operation.is_none() {
            self.operation = Some(operation);
            self.operation_name = name;
        }
    }

    pub(crate) fn source_resolved(&self) -> Option<SourceResolved<'_, C>> {
        Some(SourceResolved {
            ctx: self,
            query_hash: self.query_hash.as_deref()?,
            source: self.source.as_deref()?,
        })
    }

    pub(crate) fn document_parsed(&self) -> Option<DocumentParsed<'_, C>> {
        Some(DocumentParsed {
            document: self.document.as_deref()?,
            source: self.source_resolved()?,
        })
    }

    pub(crate) fn operation_resolved(&self) -> Option<OperationResolved<'_, C>> {
        Some(OperationResolved {
            operation: self.operation.as_deref()?,
            operation_name: self.operation_name.as_deref(),
            parsed: self.document_parsed()?,
        })
    }

    pub(crate) fn response_context(&mut self) -> ResponseContext<'_, C> {
        ResponseContext {
            request: &self.request,
            context: &self.context,
            metrics: &self.metrics,
            query_hash: self.query_hash.as_deref(),
            operation_name: self.operation_name.as_deref(),
            response: &mut self.response,
        }
    }
}

/// The request once its query text and hash are known.
pub struct SourceResolved<'a, C> {
    ctx: &'a RequestContext<C>,
    query_hash: &'a str,
    source: &'a str,
}

impl<'a, C> SourceResolved<'a, C> {
    /// The underlying context, with the lifetime of the view.
    pub fn request_context(&self) -> &'a RequestContext<C> {
        self.ctx
    }

    pub fn query_hash(&self) -> &'a str {
        self.query_hash
    }

    pub fn source(&self) -> &'a str {
        self.source
    }
}

impl<C> Deref for SourceResolved<'_, C> {
    type Target = RequestContext<C>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

/// The request once its document is parsed.
pub struct DocumentParsed<'a, C> {
    source: SourceResolved<'a, C>,
    document: &'a ExecutableDocument,
}

impl<'a, C> DocumentParsed<'a, C> {
    pub fn document(&self) -> &'a ExecutableDocument {
        self.document
    }
}

impl<'a, C> Deref for DocumentParsed<'a, C> {
    type Target = SourceResolved<'a, C>;

    fn deref(&self) -> &Self::Target {
        &self.source
    }
}

/// The request once the operation to execute is chosen.
pub struct OperationResolved<'a, C> {
    parsed: DocumentParsed<'a, C>,
    operation: &'a Positioned<OperationDefinition>,
    operation_name: Option<&'a str>,
}

impl<'a, C> OperationResolved<'a, C> {
    pub fn operation(&self) -> &'a Positioned<OperationDefinition> {
        self.operation
    }

    pub fn operation_name(&self) -> Option<&'a str> {
        self.operation_name
    }
}

impl<'a, C> Deref for OperationResolved<'a, C> {
    type Target = DocumentParsed<'a, C>;

    fn deref(&self) -> &Self::Target {
        &self.parsed
    }
}

/// What `will_send_response` hooks can see. The response is the only mutable part.
pub struct ResponseContext<'a, C> {
    pub request: &'a Request,
    pub context: &'a C,
    pub metrics: &'a RequestMetrics,
    pub query_hash: Option<&'a str>,
    pub operation_name: Option<&'a str>,
    pub response: &'a mut Response,
}
