//! Errors raised while constructing domain values.

use thiserror::Error;

/// A raw value could not become a domain identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be a positive integer, got {value}")]
    NotPositive { field: &'static str, value: u64 },

    #[error("{field} is not a number: {raw:?}")]
    NotANumber { field: &'static str, raw: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotPositive { field, .. } | ValidationError::NotANumber { field, .. } => {
                *field
            }
        }
    }
}
