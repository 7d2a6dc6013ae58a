use std::borrow::Cow;

#[feast_derive::feast_error]
pub enum OnlineStoreError {
    #[error("Online storage failure{}: {source}", format_context(.context))]
    Storage { source: feast_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Corrupted online row{}: {source}", format_context(.context))]
    Codec { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid entity key{}: {source}", format_context(.context))]
    EntityKey { source: feast_domain::DomainError, context: Option<Cow<'static, str>> },

    #[error("Internal online store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
