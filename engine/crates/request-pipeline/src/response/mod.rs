mod deferred;
mod path;

pub use deferred::{DeferredPatches, DeferredResponse, ExecutionPatch};
pub use path::PathSegment;

use serde::Serialize;

use crate::error::GraphqlError;

pub type ResponseExtensions = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub errors: Vec<GraphqlError>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: ResponseExtensions,
    #[serde(skip)]
    pub http: HttpResponseMetadata,
}

/// Transport metadata accumulated while processing the request. Never serialized with the body.
#[derive(Debug, Clone, Default)]
pub struct HttpResponseMetadata {
    pub status: Option<http::StatusCode>,
    pub headers: http::HeaderMap,
}

impl Response {
    pub fn from_error(error: impl Into<GraphqlError>) -> Self {
        Self::from_errors([error.into()])
    }

    pub fn from_errors(errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        Self {
            errors: errors.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Replaces the body of this response with the body of `other`. Transport metadata is kept
    /// and completed with whatever `other` carries.
    pub(crate) fn overwrite_body(&mut self, other: Response) {
        let Response {
            data,
            errors,
            extensions,
            http,
        } = other;

        self.data = data;
        self.errors = errors;
        self.extensions = extensions;

        if http.status.is_some() {
            self.http.status = http.status;
        }
        for (name, value) in http.headers.iter() {
            self.http.headers.insert(name.clone(), value.clone());
        }
    }

    /// Sets the HTTP status from the most relevant error code if nothing chose one before.
    pub(crate) fn ensure_error_status(&mut self) {
        if self.http.status.is_some() {
            return;
        }

        self.http.status = self
            .errors
            .iter()
            .map(|error| error.code.into_http_status_code_with_priority())
            .max_by_key(|(_, priority)| *priority)
            .map(|(status, _)| status);
    }
}

/// Outcome of a request: complete, or an initial response followed by patches.
#[derive(Debug)]
pub enum PipelineResponse {
    Complete(Response),
    Deferred(DeferredResponse),
}

impl PipelineResponse {
    /// The response sent first to the client.
    pub fn initial_response(&self) -> &Response {
        match self {
            PipelineResponse::Complete(response) => response,
            PipelineResponse::Deferred(deferred) => &deferred.initial_response,
        }
    }

    pub fn into_complete(self) -> Option<Response> {
        match self {
            PipelineResponse::Complete(response) => Some(response),
            PipelineResponse::Deferred(_) => None,
        }
    }

    pub fn into_deferred(self) -> Option<DeferredResponse> {
        match self {
            PipelineResponse::Complete(_) => None,
            PipelineResponse::Deferred(deferred) => Some(deferred),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, PipelineResponse::Deferred(_))
    }
}
