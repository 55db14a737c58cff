use async_graphql_parser::{
    types::{Directive, Field},
    Positioned,
};
use async_graphql_value::Value;

use crate::validation::{named_type, ValidationRule, Visitor, VisitorContext};

/// Rejects `@defer` on fields whose type is non-nullable: a failure in a deferred resolver
/// could not null out the field once the initial response was sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannotDeferNonNullableFields;

impl ValidationRule for CannotDeferNonNullableFields {
    fn visitor<'a>(&self) -> Box<dyn Visitor<'a> + 'a> {
        Box::new(CannotDeferNonNullableFields)
    }
}

impl<'a> Visitor<'a> for CannotDeferNonNullableFields {
    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        let Some(defer) = field
            .node
            .directives
            .iter()
            .find(|directive| directive.node.name.node.as_str() == "defer")
        else {
            return;
        };

        if !is_enabled(&defer.node, ctx) {
            return;
        }

        let (Some(parent_type), Some(field_type)) = (ctx.parent_type(), ctx.current_type()) else {
            return;
        };

        if !field_type.nullable {
            let message = format!(
                "@defer cannot be applied on non-nullable field \"{}.{}\".",
                named_type(parent_type),
                field.node.name.node
            );
            ctx.report_error([defer.pos], message);
        }
    }
}

/// `@defer(if: ...)` defaults to true. Anything that isn't a boolean is considered enabled.
fn is_enabled(directive: &Directive, ctx: &VisitorContext<'_>) -> bool {
    let Some(condition) = directive.get_argument("if") else {
        return true;
    };

    match &condition.node {
        Value::Boolean(enabled) => *enabled,
        Value::Variable(name) => ctx.boolean_variable(name.as_str()).unwrap_or(true),
        _ => true,
    }
}
