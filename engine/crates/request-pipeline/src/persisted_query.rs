//! Automatic persisted queries (APQ).
//!
//! Clients may send only the sha256 hash of a document previously registered by sending both the
//! hash and the document.

use std::time::Duration;

use runtime::{background::BackgroundTasksHandle, kv::KvStore};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::{
    error::{GraphqlError, GraphqlResult},
    request::Request,
};

const KEY_PREFIX: &str = "apq:";

pub(crate) struct PersistedQueries {
    /// Absent when persisted queries are disabled or no cache is available.
    cache: Option<KvStore>,
    ttl: Option<Duration>,
}

#[derive(Debug)]
pub(crate) struct ResolvedQuery {
    pub source: String,
    /// Hex encoded sha256 of `source`.
    pub query_hash: String,
    /// The source came out of the persisted query cache.
    pub hit: bool,
    /// Set when the request registers a new persisted query.
    pub registration: Option<Registration>,
}

#[derive(Debug)]
pub(crate) struct Registration {
    cache: KvStore,
    key: String,
    source: String,
    ttl: Option<Duration>,
}

impl Registration {
    /// Writes the document in the background. The request never waits on it and a failure is only logged.
    pub fn schedule(self, background_tasks: &BackgroundTasksHandle) {
        let Registration { cache, key, source, ttl } = self;

        background_tasks.wait_until(Box::pin(async move {
            if let Err(err) = cache.put(&key, source, ttl).await {
                tracing::warn!("Failed to register the persisted query {key}: {err}");
            }
        }));
    }
}

impl PersistedQueries {
    pub fn new(cache: Option<KvStore>, ttl: Option<Duration>) -> Self {
        PersistedQueries { cache, ttl }
    }

    #[instrument(skip_all)]
    pub async fn resolve(&self, request: &Request) -> GraphqlResult<ResolvedQuery> {
        let query = request.query();

        let Some(ext) = request.extensions.persisted_query.as_ref() else {
            let Some(query) = query else {
                return Err(GraphqlError::bad_request("Must provide query string."));
            };

            return Ok(ResolvedQuery {
                source: query.to_string(),
                query_hash: sha256_hex(query),
                hit: false,
                registration: None,
            });
        };

        let Some(cache) = self.cache.as_ref() else {
            return Err(GraphqlError::persisted_query_not_supported());
        };

        if ext.version != 1 {
            return Err(GraphqlError::bad_request("Persisted query version not supported"));
        }

        let query_hash = hex::encode(&ext.sha256_hash);
        let key = format!("{KEY_PREFIX}{query_hash}");

        match query {
            None => {
                let source = cache.get(&key).await.map_err(|err| {
                    tracing::error!("Could not read the persisted query cache: {err}");
                    GraphqlError::internal_server_error()
                })?;

                let Some(source) = source else {
                    return Err(GraphqlError::persisted_query_not_found());
                };

                Ok(ResolvedQuery {
                    source,
                    query_hash,
                    hit: true,
                    registration: None,
                })
            }
            Some(query) => {
                let digest = <Sha256 as Digest>::digest(query.as_bytes());
                if digest.as_slice() != ext.sha256_hash.as_slice() {
                    return Err(GraphqlError::bad_request("Invalid persisted query sha256Hash"));
                }

                Ok(ResolvedQuery {
                    source: query.to_string(),
                    query_hash,
                    hit: false,
                    registration: Some(Registration {
                        cache: cache.clone(),
                        key,
                        source: query.to_string(),
                        ttl: self.ttl,
                    }),
                })
            }
        }
    }
}

pub(crate) fn sha256_hex(source: &str) -> String {
    hex::encode(<Sha256 as Digest>::digest(source.as_bytes()))
}
