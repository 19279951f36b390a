//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// uniqueness, lookups). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("{0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (e.g. duplicate product name).
    #[error("duplicate field value entered: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Not-found error naming the missing record (e.g. "no product with id ...").
    pub fn not_found(kind: &str, id: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("no {kind} with id {id}"))
    }

    /// Collapse accumulated validation problems into a single error.
    ///
    /// Returns `Ok(())` when `problems` is empty.
    pub fn check(problems: Vec<String>) -> DomainResult<()> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(problems.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_without_problems() {
        assert_eq!(DomainError::check(Vec::new()), Ok(()));
    }

    #[test]
    fn check_joins_problems_in_order() {
        let err = DomainError::check(vec![
            "Please add a name".to_string(),
            "Please add a description".to_string(),
        ])
        .unwrap_err();

        assert_eq!(err.to_string(), "Please add a name, Please add a description");
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let err = DomainError::not_found("product", "abc");
        assert_eq!(err.to_string(), "no product with id abc");
    }
}
