//! Deferred execution: wraps the engine so that a deferred result is only handed back when
//! deferral is enabled for the request.

use futures_util::StreamExt;

use crate::{
    engine::{DeferredExecutionResult, ExecutionArgs, ExecutionOutcome, ExecutionResult, QueryEngine},
    error::GraphqlResult,
    response::{ExecutionPatch, PathSegment},
};

pub(crate) async fn execute<C>(engine: &dyn QueryEngine<C>, args: ExecutionArgs<'_, C>) -> GraphqlResult<ExecutionOutcome>
where
    C: Send + Sync + 'static,
{
    let enable_defer = args.enable_defer;

    match engine.execute(args).await? {
        ExecutionOutcome::Deferred(deferred) if !enable_defer => {
            tracing::debug!("Merging deferred patches, deferral is disabled");
            Ok(ExecutionOutcome::Complete(merge_patches(deferred).await))
        }
        outcome => Ok(outcome),
    }
}

/// Drains every patch into the initial result.
pub(crate) async fn merge_patches(deferred: DeferredExecutionResult) -> ExecutionResult {
    let DeferredExecutionResult {
        mut initial_result,
        mut deferred_patches,
    } = deferred;

    while let Some(patch) = deferred_patches.next().await {
        merge_patch(&mut initial_result, patch);
    }

    initial_result
}

fn merge_patch(result: &mut ExecutionResult, patch: ExecutionPatch) {
    result.errors.extend(patch.errors);

    let Some(data) = patch.data else {
        return;
    };

    let target = result
        .data
        .as_mut()
        .and_then(|root| value_at_path(root, &patch.path))
        .filter(|target| target.is_object());

    if let Some(target) = target {
        deep_merge(target, data);
    }
}

fn value_at_path<'a>(value: &'a mut serde_json::Value, path: &[PathSegment]) -> Option<&'a mut serde_json::Value> {
    path.iter().try_fold(value, |value, segment| match segment {
        PathSegment::Field(name) => value.get_mut(name.as_str()),
        PathSegment::Index(index) => value.get_mut(*index),
    })
}

fn deep_merge(target: &mut serde_json::Value, source: serde_json::Value) {
    match (target, source) {
        (serde_json::Value::Object(target), serde_json::Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
