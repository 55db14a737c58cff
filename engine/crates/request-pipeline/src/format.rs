use std::sync::Arc;

use crate::{context::RequestContext, error::GraphqlError, request::Request, response::Response};

pub type FormatErrorFn = Arc<dyn Fn(GraphqlError) -> GraphqlError + Send + Sync>;

pub type FormatResponseFn<C> = Arc<dyn Fn(Response, &FormatContext<'_, C>) -> Response + Send + Sync>;

/// Read-only view of the request given to the response formatter.
pub struct FormatContext<'a, C> {
    pub request: &'a Request,
    pub context: &'a C,
    pub query_hash: Option<&'a str>,
    pub operation_name: Option<&'a str>,
}

impl<C> RequestContext<C> {
    pub(crate) fn format_context(&self) -> FormatContext<'_, C> {
        FormatContext {
            request: &self.request,
            context: &self.context,
            query_hash: self.query_hash(),
            operation_name: self.operation_name(),
        }
    }
}

/// Extension key holding internal details of an error, only kept in debug mode.
pub const EXCEPTION_EXTENSION: &str = "exception";

#[derive(Clone)]
pub(crate) struct ErrorFormatter {
    debug: bool,
    format_error: Option<FormatErrorFn>,
}

impl ErrorFormatter {
    pub fn new(debug: bool, format_error: Option<FormatErrorFn>) -> Self {
        ErrorFormatter { debug, format_error }
    }

    pub fn format(&self, mut error: GraphqlError) -> GraphqlError {
        if !self.debug {
            error.extensions.retain(|(key, _)| key != EXCEPTION_EXTENSION);
        }

        match &self.format_error {
            Some(format_error) => format_error(error),
            None => error,
        }
    }

    pub fn format_all(&self, errors: Vec<GraphqlError>) -> Vec<GraphqlError> {
        errors.into_iter().map(|error| self.format(error)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error() -> GraphqlError {
        GraphqlError::internal_server_error()
            .with_extension(EXCEPTION_EXTENSION, serde_json::json!({"stacktrace": ["boom"]}))
            .with_extension("retryable", true)
    }

    #[test]
    fn exception_is_stripped_outside_debug() {
        let formatted = ErrorFormatter::new(false, None).format(error());
        assert!(formatted.extension(EXCEPTION_EXTENSION).is_none());
        assert_eq!(formatted.extension("retryable"), Some(&serde_json::json!(true)));

        let formatted = ErrorFormatter::new(true, None).format(error());
        assert!(formatted.extension(EXCEPTION_EXTENSION).is_some());
    }

    #[test]
    fn custom_formatter_runs_last() {
        let formatter = ErrorFormatter::new(
            false,
            Some(Arc::new(|error: GraphqlError| {
                let count = error.extensions.len();
                GraphqlError {
                    message: format!("{} ({count} extensions)", error.message).into(),
                    ..error
                }
            })),
        );

        assert_eq!(formatter.format(error()).message, "Internal server error (1 extensions)");
    }
}
