use futures_util::future::BoxFuture;
use runtime::background::BackgroundTasks;

/// Spawns every background future on the current tokio runtime and never awaits it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioBackgroundTasks;

impl BackgroundTasks for TokioBackgroundTasks {
    fn wait_until(&self, fut: BoxFuture<'static, ()>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(fut);
            }
            Err(err) => tracing::error!("Dropping background task, no tokio runtime available: {err}"),
        }
    }
}
