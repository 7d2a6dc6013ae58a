use std::borrow::Cow;

#[feast_derive::feast_error]
pub enum RegistryError {
    #[error("Entity {name} does not exist in project {project}")]
    EntityNotFound { name: String, project: String },

    #[error("Feature view {name} does not exist in project {project}")]
    FeatureViewNotFound { name: String, project: String },

    #[error("Project {name} does not exist")]
    ProjectNotFound { name: String },

    #[error("Project {name} already exists")]
    ProjectExists { name: String },

    #[error("Project {name} is archived")]
    ProjectArchived { name: String },

    #[error("Registry storage failure{}: {source}", format_context(.context))]
    Storage { source: feast_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Registry file is corrupted{}: {source}", format_context(.context))]
    Codec { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid registry object{}: {source}", format_context(.context))]
    Domain { source: feast_domain::DomainError, context: Option<Cow<'static, str>> },

    #[error("Internal registry error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl RegistryError {
    /// True for the `*NotFound` variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::FeatureViewNotFound { .. } | Self::ProjectNotFound { .. }
        )
    }
}
