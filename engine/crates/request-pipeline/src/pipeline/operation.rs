use async_graphql_parser::{
    types::{DocumentOperations, ExecutableDocument, OperationDefinition},
    Positioned,
};

use crate::error::{GraphqlError, GraphqlResult};

/// Picks the operation to execute. The name is `None` for anonymous operations.
pub(super) fn select_operation(
    document: &ExecutableDocument,
    operation_name: Option<&str>,
) -> GraphqlResult<(Option<String>, Positioned<OperationDefinition>)> {
    let unknown = |name: &str| GraphqlError::bad_request(format!(r#"Unknown operation named "{name}""#));

    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Ok((None, operation.clone())),
        (DocumentOperations::Single(_), Some(name)) => Err(unknown(name)),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .get(name)
            .map(|operation| (Some(name.to_string()), operation.clone()))
            .ok_or_else(|| unknown(name)),
        (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => operations
            .iter()
            .next()
            .map(|(name, operation)| (Some(name.to_string()), operation.clone()))
            .ok_or_else(|| GraphqlError::bad_request("Operation name required in request.")),
        (DocumentOperations::Multiple(_), None) => Err(GraphqlError::bad_request("Operation name required in request.")),
    }
}
