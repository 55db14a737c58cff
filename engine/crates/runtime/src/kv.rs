use std::{sync::Arc, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Kv error: {0}")]
    Kv(String),
}

pub type KvResult<T> = Result<T, KvError>;

/// Shared handle over a host-provided asynchronous key-value store.
///
/// Keys are namespaced by their users, the request pipeline writes persisted queries under
/// `apq:<sha256>`.
#[derive(Clone)]
pub struct KvStore(Arc<dyn KvStoreInner>);

impl KvStore {
    pub fn new(inner: impl KvStoreInner + 'static) -> Self {
        Self(Arc::new(inner))
    }
}

impl std::ops::Deref for KvStore {
    type Target = dyn KvStoreInner;
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
pub trait KvStoreInner: Send + Sync {
    async fn get(&self, name: &str) -> KvResult<Option<String>>;
    async fn put(&self, name: &str, value: String, expiration_ttl: Option<Duration>) -> KvResult<()>;
}
