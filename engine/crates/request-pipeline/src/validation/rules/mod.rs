mod cannot_defer_non_nullable_fields;

pub use cannot_defer_non_nullable_fields::CannotDeferNonNullableFields;
