use std::borrow::Cow;

#[feast_derive::feast_error]
pub enum OfflineStoreError {
    #[error("Column '{column}' not found in {path}")]
    MissingColumn { column: String, path: String },

    #[error("Invalid value in {path} at row {row}, column '{column}': {message}")]
    InvalidValue { path: String, row: usize, column: String, message: String },

    #[error("Feature view '{view}' references unknown entity '{entity}'")]
    UnknownEntity { entity: String, view: String },

    #[error("Feature view '{view}' has no feature '{feature}'")]
    UnknownFeature { feature: String, view: String },

    #[error("CSV failure{}: {source}", format_context(.context))]
    Csv { source: csv::Error, context: Option<Cow<'static, str>> },

    #[error("I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid entity key{}: {source}", format_context(.context))]
    Domain { source: feast_domain::DomainError, context: Option<Cow<'static, str>> },

    #[error("Internal offline store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
