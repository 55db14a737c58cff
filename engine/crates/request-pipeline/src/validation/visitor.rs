use async_graphql_parser::{
    types::{
        BaseType, ExecutableDocument, Field, FragmentSpread, InlineFragment, OperationDefinition, Selection,
        SelectionSet, Type,
    },
    Pos, Positioned,
};
use async_graphql_value::{ConstValue, Name};

use crate::{
    error::{ErrorCode, GraphqlError},
    request::Variables,
    schema::Schema,
};

type Visitors<'a, 'v> = [Box<dyn Visitor<'a> + 'v>];

#[allow(unused_variables)]
pub trait Visitor<'a> {
    fn enter_operation(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
    }

    fn exit_operation(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
    }

    fn enter_selection_set(&mut self, ctx: &mut VisitorContext<'a>, selection_set: &'a Positioned<SelectionSet>) {}
    fn exit_selection_set(&mut self, ctx: &mut VisitorContext<'a>, selection_set: &'a Positioned<SelectionSet>) {}

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {}
    fn exit_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {}

    fn enter_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, spread: &'a Positioned<FragmentSpread>) {}
    fn exit_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, spread: &'a Positioned<FragmentSpread>) {}

    fn enter_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, fragment: &'a Positioned<InlineFragment>) {}
    fn exit_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, fragment: &'a Positioned<InlineFragment>) {}
}

/// Walks the operations of a document, fragments being visited inline where they are spread.
pub struct VisitorContext<'a> {
    pub schema: &'a dyn Schema,
    pub document: &'a ExecutableDocument,
    pub variables: &'a Variables,
    errors: Vec<GraphqlError>,
    operation: Option<&'a Positioned<OperationDefinition>>,
    type_stack: Vec<Option<Type>>,
    fragment_stack: Vec<&'a str>,
}

impl<'a> VisitorContext<'a> {
    pub(crate) fn new(schema: &'a dyn Schema, document: &'a ExecutableDocument, variables: &'a Variables) -> Self {
        VisitorContext {
            schema,
            document,
            variables,
            errors: Vec::new(),
            operation: None,
            type_stack: Vec::new(),
            fragment_stack: Vec::new(),
        }
    }

    pub fn report_error(&mut self, locations: impl IntoIterator<Item = Pos>, message: impl Into<String>) {
        self.errors
            .push(GraphqlError::new(message.into(), ErrorCode::OperationValidationError).with_locations(locations));
    }

    /// Type of the current selection. Inside `enter_field` this is the type of the field itself.
    pub fn current_type(&self) -> Option<&Type> {
        self.type_stack.last().and_then(Option::as_ref)
    }

    /// Type holding the current selection. Inside `enter_field` this is the type declaring the field.
    pub fn parent_type(&self) -> Option<&Type> {
        match self.type_stack.len() {
            0 | 1 => None,
            len => self.type_stack[len - 2].as_ref(),
        }
    }

    /// Boolean value of a variable. A variable missing from the request takes the default declared by
    /// the operation being visited.
    pub fn boolean_variable(&self, name: &str) -> Option<bool> {
        if let Some(value) = self.variables.get(name) {
            return value.as_bool();
        }

        let definition = self
            .operation?
            .node
            .variable_definitions
            .iter()
            .find(|definition| definition.node.name.node.as_str() == name)?;

        match &definition.node.default_value.as_ref()?.node {
            ConstValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn into_errors(self) -> Vec<GraphqlError> {
        self.errors
    }

    fn with_type(&mut self, ty: Option<Type>, f: impl FnOnce(&mut VisitorContext<'a>)) {
        self.type_stack.push(ty);
        f(self);
        self.type_stack.pop();
    }
}

/// Name of the innermost type, `User` for `[User!]!`.
pub fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(ty) => named_type(ty),
    }
}

fn named(name: &str) -> Option<Type> {
    Type::new(name)
}

pub(super) fn visit<'a>(visitors: &mut Visitors<'a, '_>, ctx: &mut VisitorContext<'a>, document: &'a ExecutableDocument) {
    for (name, operation) in document.operations.iter() {
        let root = ctx.schema.root_type(operation.node.ty).and_then(named);
        ctx.operation = Some(operation);

        ctx.with_type(root, |ctx| {
            for visitor in visitors.iter_mut() {
                visitor.enter_operation(ctx, name, operation);
            }
            visit_selection_set(visitors, ctx, &operation.node.selection_set);
            for visitor in visitors.iter_mut() {
                visitor.exit_operation(ctx, name, operation);
            }
        });
    }
}

fn visit_selection_set<'a>(
    visitors: &mut Visitors<'a, '_>,
    ctx: &mut VisitorContext<'a>,
    selection_set: &'a Positioned<SelectionSet>,
) {
    for visitor in visitors.iter_mut() {
        visitor.enter_selection_set(ctx, selection_set);
    }

    for selection in &selection_set.node.items {
        match &selection.node {
            Selection::Field(field) => visit_field(visitors, ctx, field),
            Selection::FragmentSpread(spread) => visit_fragment_spread(visitors, ctx, spread),
            Selection::InlineFragment(fragment) => visit_inline_fragment(visitors, ctx, fragment),
        }
    }

    for visitor in visitors.iter_mut() {
        visitor.exit_selection_set(ctx, selection_set);
    }
}

fn visit_field<'a>(visitors: &mut Visitors<'a, '_>, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
    let field_type = ctx
        .current_type()
        .and_then(|parent| ctx.schema.field_type(named_type(parent), field.node.name.node.as_str()));

    ctx.with_type(field_type, |ctx| {
        for visitor in visitors.iter_mut() {
            visitor.enter_field(ctx, field);
        }
        visit_selection_set(visitors, ctx, &field.node.selection_set);
        for visitor in visitors.iter_mut() {
            visitor.exit_field(ctx, field);
        }
    });
}

fn visit_inline_fragment<'a>(
    visitors: &mut Visitors<'a, '_>,
    ctx: &mut VisitorContext<'a>,
    fragment: &'a Positioned<InlineFragment>,
) {
    let ty = match &fragment.node.type_condition {
        Some(condition) => named(condition.node.on.node.as_str()),
        None => ctx.current_type().cloned(),
    };

    ctx.with_type(ty, |ctx| {
        for visitor in visitors.iter_mut() {
            visitor.enter_inline_fragment(ctx, fragment);
        }
        visit_selection_set(visitors, ctx, &fragment.node.selection_set);
        for visitor in visitors.iter_mut() {
            visitor.exit_inline_fragment(ctx, fragment);
        }
    });
}

fn visit_fragment_spread<'a>(
    visitors: &mut Visitors<'a, '_>,
    ctx: &mut VisitorContext<'a>,
    spread: &'a Positioned<FragmentSpread>,
) {
    let fragment_name = spread.node.fragment_name.node.as_str();
    // Unknown fragments and cycles are reported by the engine's own rules.
    let Some(fragment) = ctx.document.fragments.get(fragment_name) else {
        return;
    };
    if ctx.fragment_stack.contains(&fragment_name) {
        return;
    }

    for visitor in visitors.iter_mut() {
        visitor.enter_fragment_spread(ctx, spread);
    }

    ctx.fragment_stack.push(fragment_name);
    ctx.with_type(named(fragment.node.type_condition.node.on.node.as_str()), |ctx| {
        visit_selection_set(visitors, ctx, &fragment.node.selection_set);
    });
    ctx.fragment_stack.pop();

    for visitor in visitors.iter_mut() {
        visitor.exit_fragment_spread(ctx, spread);
    }
}
