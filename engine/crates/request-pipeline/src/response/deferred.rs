use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{stream::BoxStream, Stream, StreamExt};
use serde::Serialize;

use super::{PathSegment, Response};
use crate::error::GraphqlError;

/// Data resolved for a deferred selection, to be inserted at `path` of the initial response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub path: Vec<PathSegment>,
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl ExecutionPatch {
    pub fn new(path: impl Into<Vec<PathSegment>>, data: serde_json::Value) -> Self {
        Self {
            label: None,
            path: path.into(),
            data: Some(data),
            errors: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct DeferredResponse {
    pub initial_response: Response,
    pub deferred_patches: DeferredPatches,
}

type RequestEnd = Box<dyn FnOnce() + Send>;

/// Lazy, single-pass sequence of patches.
///
/// Consumers drain it to completion to let every deferred resolver finish. Dropping it early
/// cancels the outstanding deferred work. In both cases the end of the request is signaled
/// exactly once.
pub struct DeferredPatches {
    patches: BoxStream<'static, ExecutionPatch>,
    on_request_end: Option<RequestEnd>,
}

impl DeferredPatches {
    pub fn new(patches: impl Stream<Item = ExecutionPatch> + Send + 'static) -> Self {
        Self {
            patches: patches.boxed(),
            on_request_end: None,
        }
    }

    pub(crate) fn on_request_end(mut self, on_request_end: impl FnOnce() + Send + 'static) -> Self {
        self.on_request_end = Some(Box::new(on_request_end));
        self
    }

    fn finish(&mut self) {
        if let Some(on_request_end) = self.on_request_end.take() {
            on_request_end();
        }
    }
}

impl Stream for DeferredPatches {
    type Item = ExecutionPatch;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match this.patches.poll_next_unpin(cx) {
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            poll => poll,
        }
    }
}

impl Drop for DeferredPatches {
    fn drop(&mut self) {
        self.finish();
    }
}

impl fmt::Debug for DeferredPatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredPatches")
            .field("finished", &self.on_request_end.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures_util::stream;

    use super::*;

    fn patches(count: &Arc<AtomicUsize>) -> DeferredPatches {
        let count = count.clone();
        DeferredPatches::new(stream::iter(vec![
            ExecutionPatch::new(vec![PathSegment::from("a")], serde_json::json!({"b": 1})),
            ExecutionPatch::new(vec![PathSegment::from("c")], serde_json::json!({"d": 2})),
        ]))
        .on_request_end(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn request_ends_once_drained() {
        let ended = Arc::new(AtomicUsize::new(0));
        let mut patches = patches(&ended);

        assert!(patches.next().await.is_some());
        assert!(patches.next().await.is_some());
        assert_eq!(ended.load(Ordering::SeqCst), 0);

        assert!(patches.next().await.is_none());
        assert_eq!(ended.load(Ordering::SeqCst), 1);

        drop(patches);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_ends_when_abandoned() {
        let ended = Arc::new(AtomicUsize::new(0));
        let mut patches = patches(&ended);

        assert!(patches.next().await.is_some());
        drop(patches);

        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }
}
