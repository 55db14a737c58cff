mod rules;
mod visitor;

use std::sync::Arc;

use async_graphql_parser::types::ExecutableDocument;

pub use rules::CannotDeferNonNullableFields;
pub use visitor::{named_type, Visitor, VisitorContext};

use crate::{error::GraphqlError, request::Variables, schema::Schema};

/// A check run over the whole document before execution. Each run gets a fresh visitor.
pub trait ValidationRule: Send + Sync {
    fn visitor<'a>(&self) -> Box<dyn Visitor<'a> + 'a>;
}

pub fn check_rules(
    schema: &dyn Schema,
    document: &ExecutableDocument,
    variables: &Variables,
    rules: &[Arc<dyn ValidationRule>],
) -> Vec<GraphqlError> {
    if rules.is_empty() {
        return Vec::new();
    }

    let mut ctx = VisitorContext::new(schema, document, variables);
    let mut visitors = rules.iter().map(|rule| rule.visitor()).collect::<Vec<_>>();
    visitor::visit(&mut visitors, &mut ctx, document);

    ctx.into_errors()
}
