//! Error types for shape key operations.

use payu_config::ConfigError;

/// How a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad selection or object; reported immediately, nothing mutated
    Validation,
    /// The item cannot be processed in its current state; batches skip it
    State,
    /// Anything else; batches count it as failed
    Unexpected,
}

/// Errors that can occur during shape key operations
#[derive(Debug, thiserror::Error)]
pub enum ShapeKeyError {
    #[error("No active object")]
    NoActiveObject,
    #[error("'{0}' is not a mesh object")]
    NotAMesh(String),
    #[error("'{0}' has no shape keys")]
    NoShapeKeys(String),
    #[error("No shape key selected")]
    NoSelection,
    #[error("Shape key handle is no longer valid")]
    StaleHandle,
    #[error("Shape key '{0}' not found")]
    NotFound(String),

    #[error("The Basis shape key cannot be split")]
    BaseNotSplittable,
    #[error("The Basis shape key cannot be linked")]
    BaseNotLinkable,
    #[error("'{0}' is already split")]
    AlreadySplit(String),
    #[error("'{0}' is an MMD alias half and cannot be split")]
    AliasMember(String),
    #[error("'{left}' and '{right}' already exist")]
    AlreadyExists { left: String, right: String },
    #[error("No matching left/right counterpart for '{0}'")]
    NoCounterpart(String),
    #[error("Linking '{0}' would create a dependency cycle")]
    LinkageCycle(String),

    #[error("Position count mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Mirror modifier failed: {0}")]
    Modifier(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ShapeKeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShapeKeyError::NoActiveObject
            | ShapeKeyError::NotAMesh(_)
            | ShapeKeyError::NoShapeKeys(_)
            | ShapeKeyError::NoSelection
            | ShapeKeyError::StaleHandle
            | ShapeKeyError::NotFound(_) => ErrorKind::Validation,
            ShapeKeyError::BaseNotSplittable
            | ShapeKeyError::BaseNotLinkable
            | ShapeKeyError::AlreadySplit(_)
            | ShapeKeyError::AliasMember(_)
            | ShapeKeyError::AlreadyExists { .. }
            | ShapeKeyError::NoCounterpart(_)
            | ShapeKeyError::LinkageCycle(_) => ErrorKind::State,
            ShapeKeyError::LengthMismatch { .. }
            | ShapeKeyError::Modifier(_)
            | ShapeKeyError::Config(_) => ErrorKind::Unexpected,
        }
    }
}

/// Result type for shape key operations.
pub type ShapeKeyResult<T> = Result<T, ShapeKeyError>;

/// Record an error's message in a batch's reason list, keeping first-seen
/// order and dropping duplicates.
pub(crate) fn push_reason(reasons: &mut Vec<String>, reason: String) {
    if !reasons.contains(&reason) {
        reasons.push(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_keep_first_seen_order() {
        let mut reasons = Vec::new();
        push_reason(&mut reasons, ShapeKeyError::AlreadySplit("A左".into()).to_string());
        push_reason(&mut reasons, ShapeKeyError::BaseNotSplittable.to_string());
        push_reason(&mut reasons, ShapeKeyError::AlreadySplit("A左".into()).to_string());
        assert_eq!(
            reasons,
            vec![
                "'A左' is already split".to_string(),
                "The Basis shape key cannot be split".to_string(),
            ]
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ShapeKeyError::NoActiveObject.kind(), ErrorKind::Validation);
        assert_eq!(ShapeKeyError::LinkageCycle("B.Open".into()).kind(), ErrorKind::State);
        assert_eq!(ShapeKeyError::Modifier("x".into()).kind(), ErrorKind::Unexpected);
    }
}
