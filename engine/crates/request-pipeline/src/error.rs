use std::borrow::Cow;

use async_graphql_parser::Pos;
use serde::ser::SerializeMap;

use crate::response::PathSegment;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    BadRequest,
    InternalServerError,
    // Used for APQ
    PersistedQueryNotSupported,
    PersistedQueryNotFound,
    // Operation preparation phases
    OperationParsingError,
    OperationValidationError,
    /// Raised by the application, typically from a resolver or a hook.
    Custom(Cow<'static, str>),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::PersistedQueryNotSupported => "PERSISTED_QUERY_NOT_SUPPORTED",
            ErrorCode::PersistedQueryNotFound => "PERSISTED_QUERY_NOT_FOUND",
            ErrorCode::OperationParsingError => "OPERATION_PARSING_ERROR",
            ErrorCode::OperationValidationError => "OPERATION_VALIDATION_ERROR",
            ErrorCode::Custom(code) => code,
        }
    }

    pub fn into_http_status_code_with_priority(&self) -> (http::StatusCode, usize) {
        match self {
            ErrorCode::OperationParsingError
            | ErrorCode::OperationValidationError
            | ErrorCode::PersistedQueryNotFound
            | ErrorCode::PersistedQueryNotSupported
            | ErrorCode::BadRequest => (http::StatusCode::BAD_REQUEST, 1000),
            // least helpful error codes
            ErrorCode::Custom(_) | ErrorCode::InternalServerError => (http::StatusCode::INTERNAL_SERVER_ERROR, 0),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for Location {
    fn from(pos: Pos) -> Self {
        Location {
            line: pos.line,
            column: pos.column,
        }
    }
}

pub type GraphqlResult<T> = Result<T, GraphqlError>;

/// User facing error. Serialized as `{message, locations?, path?, extensions: {code, ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlError {
    pub message: Cow<'static, str>,
    pub code: ErrorCode,
    pub locations: Vec<Location>,
    pub path: Option<Vec<PathSegment>>,
    // Serialized as a map, but kept as a Vec for efficiency.
    pub extensions: Vec<(Cow<'static, str>, serde_json::Value)>,
}

impl GraphqlError {
    pub fn new(message: impl Into<Cow<'static, str>>, code: ErrorCode) -> Self {
        GraphqlError {
            message: message.into(),
            code,
            locations: Vec::new(),
            path: None,
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<Location>) -> Self {
        self.locations.push(location.into());
        self
    }

    #[must_use]
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = impl Into<Location>>) -> Self {
        self.locations.extend(locations.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<Vec<PathSegment>>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.push((key.into(), value.into()));
        self
    }

    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions
            .iter()
            .find_map(|(name, value)| (name == key).then_some(value))
    }

    // ------------- //
    // Common errors //
    // ------------- //

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        GraphqlError::new(message, ErrorCode::BadRequest)
    }

    pub fn internal_server_error() -> Self {
        GraphqlError::new("Internal server error", ErrorCode::InternalServerError)
    }

    pub fn persisted_query_not_supported() -> Self {
        GraphqlError::new("Persisted queries are not supported", ErrorCode::PersistedQueryNotSupported)
    }

    pub fn persisted_query_not_found() -> Self {
        GraphqlError::new("Persisted query not found", ErrorCode::PersistedQueryNotFound)
    }
}

impl From<async_graphql_parser::Error> for GraphqlError {
    fn from(err: async_graphql_parser::Error) -> Self {
        GraphqlError::new(err.to_string(), ErrorCode::OperationParsingError).with_locations(err.positions())
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

impl serde::Serialize for GraphqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut len = 2;
        if !self.locations.is_empty() {
            len += 1;
        }
        if self.path.is_some() {
            len += 1;
        }

        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("message", &self.message)?;
        if !self.locations.is_empty() {
            map.serialize_entry("locations", &self.locations)?;
        }
        if let Some(path) = &self.path {
            map.serialize_entry("path", path)?;
        }
        map.serialize_entry("extensions", &SerializableExtensions(self))?;
        map.end()
    }
}

struct SerializableExtensions<'a>(&'a GraphqlError);

impl serde::Serialize for SerializableExtensions<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let error = self.0;
        let mut map = serializer.serialize_map(Some(error.extensions.len() + 1))?;
        map.serialize_entry("code", &error.code)?;
        for (key, value) in &error.extensions {
            if key != "code" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Failures of the pipeline setup itself. They are never turned into a GraphQL response.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Please use the data sources option of the pipeline instead of attaching data sources to the request context yourself")]
    DataSourcesAlreadyDefined,
    #[error("Could not initialize the data source '{name}': {message}")]
    DataSourceInitialization { name: String, message: String },
}
