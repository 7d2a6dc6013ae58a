use std::borrow::Cow;

#[feast_derive::feast_error]
pub enum DomainError {
    #[error("Invalid {kind} name '{name}': names may only contain letters, digits and underscores")]
    InvalidName { kind: &'static str, name: String },

    #[error("Invalid feature reference '{reference}'{}", format_context(.context))]
    InvalidFeatureRef { reference: String, context: Option<Cow<'static, str>> },

    #[error("{message}")]
    InvalidLabels { message: Cow<'static, str> },

    #[error("Invalid timestamp '{input}'{}", format_context(.context))]
    InvalidTimestamp { input: String, context: Option<Cow<'static, str>> },

    #[error("Value {value} does not match type {expected}")]
    TypeMismatch { expected: crate::value::ValueType, value: String },

    #[error("Invalid {field}{}: {message}", format_context(.context))]
    InvalidDefinition {
        field: &'static str,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Serialization failure{}: {source}", format_context(.context))]
    Serialization { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Internal domain error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
