use std::{collections::HashMap, time::Duration};

use futures_util::lock::Mutex;
use runtime::kv::{KvResult, KvStoreInner};
use web_time::Instant;

pub struct InMemoryKvStore {
    inner: Mutex<KvInner>,
}

struct KvInner {
    // for testing
    now: Box<dyn Fn() -> Instant + Send + Sync>,
    entries: HashMap<String, KvEntry>,
}

struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn new_with_time(now: impl Fn() -> Instant + Send + Sync + 'static) -> Self {
        InMemoryKvStore {
            inner: Mutex::new(KvInner {
                now: Box::new(now),
                entries: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        InMemoryKvStore {
            inner: Mutex::new(KvInner {
                now: Box::new(Instant::now),
                entries: HashMap::new(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl KvStoreInner for InMemoryKvStore {
    async fn get(&self, name: &str) -> KvResult<Option<String>> {
        let mut inner = self.inner.lock().await;
        let now = (inner.now)();

        let expired = match inner.entries.get(name) {
            None => return Ok(None),
            Some(entry) => entry.expires_at.is_some_and(|expires_at| expires_at <= now),
        };

        if expired {
            tracing::debug!("Evicting expired key {name}");
            inner.entries.remove(name);
            return Ok(None);
        }

        Ok(inner.entries.get(name).map(|entry| entry.value.clone()))
    }

    async fn put(&self, name: &str, value: String, expiration_ttl: Option<Duration>) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        let now = (inner.now)();
        let expires_at = expiration_ttl.and_then(|ttl| now.checked_add(ttl));

        inner.entries.insert(name.to_string(), KvEntry { value, expires_at });

        Ok(())
    }
}
