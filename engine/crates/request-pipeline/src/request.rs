use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type Variables = serde_json::Map<String, serde_json::Value>;

/// GraphQL request as received from the transport. Immutable once received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The query source of the request. Absent for persisted queries sent by hash only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub variables: Variables,

    #[serde(default)]
    pub extensions: RequestExtensions,

    /// Transport level metadata, never part of the wire format.
    #[serde(skip)]
    pub http: HttpRequestMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_query: Option<PersistedQueryRequestExtension>,
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueryRequestExtension {
    pub version: u32,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub sha256_hash: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpRequestMetadata {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
}

impl Default for HttpRequestMetadata {
    fn default() -> Self {
        HttpRequestMetadata {
            method: http::Method::POST,
            uri: http::Uri::default(),
            headers: http::HeaderMap::new(),
        }
    }
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Request relying only on a previously registered persisted query.
    pub fn persisted(sha256_hash: impl Into<Vec<u8>>) -> Self {
        Self::default().with_persisted_query(sha256_hash)
    }

    #[must_use]
    pub fn with_operation_name(self, name: impl Into<String>) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_variables(self, variables: Variables) -> Self {
        Self { variables, ..self }
    }

    #[must_use]
    pub fn with_persisted_query(mut self, sha256_hash: impl Into<Vec<u8>>) -> Self {
        self.extensions.persisted_query = Some(PersistedQueryRequestExtension {
            version: 1,
            sha256_hash: sha256_hash.into(),
        });
        self
    }

    #[must_use]
    pub fn with_http_method(mut self, method: http::Method) -> Self {
        self.http.method = method;
        self
    }

    /// The query text, if the client sent a non-empty one.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref().filter(|query| !query.is_empty())
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }
}

fn deserialize_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
