use std::collections::HashMap;

use async_graphql_parser::types::{OperationType, Type};

/// What the pipeline needs to know about the schema: root types and field output types.
///
/// Building the schema is the business of the engine. Validation rules only ever look up the
/// type of a field on a named parent.
pub trait Schema: Send + Sync {
    fn root_type(&self, operation_type: OperationType) -> Option<&str>;

    fn field_type(&self, parent_type: &str, field_name: &str) -> Option<Type>;
}

/// Schema described as a plain table of fields, mostly useful for tests and small gateways.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
    fields: HashMap<String, HashMap<String, Type>>,
}

impl StaticSchema {
    pub fn new(query_type: impl Into<String>) -> Self {
        StaticSchema {
            query: query_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_mutation(mut self, mutation_type: impl Into<String>) -> Self {
        self.mutation = Some(mutation_type.into());
        self
    }

    #[must_use]
    pub fn with_subscription(mut self, subscription_type: impl Into<String>) -> Self {
        self.subscription = Some(subscription_type.into());
        self
    }

    /// Declares `parent_type.field_name` with the given type in SDL notation, e.g. `[User!]!`.
    /// Invalid notations are ignored.
    #[must_use]
    pub fn with_field(mut self, parent_type: &str, field_name: &str, ty: &str) -> Self {
        if let Some(ty) = Type::new(ty) {
            self.fields
                .entry(parent_type.to_string())
                .or_default()
                .insert(field_name.to_string(), ty);
        }
        self
    }
}

impl Schema for StaticSchema {
    fn root_type(&self, operation_type: OperationType) -> Option<&str> {
        match operation_type {
            OperationType::Query => Some(&self.query),
            OperationType::Mutation => self.mutation.as_deref(),
            OperationType::Subscription => self.subscription.as_deref(),
        }
    }

    fn field_type(&self, parent_type: &str, field_name: &str) -> Option<Type> {
        self.fields.get(parent_type)?.get(field_name).cloned()
    }
}
