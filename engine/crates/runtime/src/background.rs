use std::sync::Arc;

use futures_util::future::BoxFuture;

/// Work the request does not wait for. Implementations decide whether the future runs on its
/// own task or is tracked until the host is done with the request.
pub trait BackgroundTasks: Send + Sync {
    fn wait_until(&self, fut: BoxFuture<'static, ()>);
}

impl<T: BackgroundTasks> BackgroundTasks for Arc<T> {
    fn wait_until(&self, fut: BoxFuture<'static, ()>) {
        T::wait_until(self, fut)
    }
}

#[derive(Clone)]
pub struct BackgroundTasksHandle(Arc<dyn BackgroundTasks>);

impl BackgroundTasksHandle {
    pub fn new(inner: impl BackgroundTasks + 'static) -> Self {
        Self(Arc::new(inner))
    }

    pub fn wait_until(&self, fut: BoxFuture<'static, ()>) {
        self.0.wait_until(fut)
    }
}

impl std::fmt::Debug for BackgroundTasksHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasksHandle").finish_non_exhaustive()
    }
}

#[cfg(feature = "test-utils")]
pub use test_utils::CollectedTasks;

#[cfg(feature = "test-utils")]
mod test_utils {
    use std::sync::Mutex;

    use futures_util::future::BoxFuture;

    use super::BackgroundTasks;

    /// Keeps every background future around until the test explicitly drives them.
    #[derive(Default)]
    pub struct CollectedTasks {
        futures: Mutex<Vec<BoxFuture<'static, ()>>>,
    }

    impl CollectedTasks {
        pub fn pending(&self) -> usize {
            self.futures.lock().map(|futures| futures.len()).unwrap_or_default()
        }

        pub async fn wait_for_futures(&self) {
            let futures = match self.futures.lock() {
                Ok(mut futures) => futures.drain(..).collect::<Vec<_>>(),
                Err(_) => Vec::new(),
            };
            futures_util::future::join_all(futures).await;
        }
    }

    impl BackgroundTasks for CollectedTasks {
        fn wait_until(&self, fut: BoxFuture<'static, ()>) {
            if let Ok(mut futures) = self.futures.lock() {
                futures.push(fut);
            }
        }
    }
}
