use thiserror::Error;

/// Errors raised by `validate()` methods on shared configuration structs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates were supplied.
    #[error("trusted root certificates must be provided when TLS is enabled")]
    MissingTrustedRootCerts,

    /// A field value violates one of its constraints.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable description of the violated constraint.
        constraint: String,
    },
}

impl ValidationError {
    /// Builds an [`ValidationError::InvalidFieldValue`] without format boilerplate.
    pub fn invalid(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}
