use crate::error::DomainError;

/// Checks that a project, entity, feature or feature view name is `[A-Za-z0-9_]+`.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), DomainError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DomainError::InvalidName { kind, name: name.to_owned() })
    }
}

/// Turns an arbitrary directory name into a valid project name: every illegal character
/// becomes `_`, and an empty result falls back to `default`.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let name: String =
        raw.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if name.is_empty() { "default".to_owned() } else { name }
}
