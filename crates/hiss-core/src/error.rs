//! Validation errors for parameter values and definitions.

use crate::param::ParamType;
use thiserror::Error;

/// Reasons a parameter value, definition, or filter setting was rejected.
///
/// Returned before any state is touched: a store keeps its previous
/// snapshot and a filter keeps its previous history when one of these is
/// produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// No definition exists for the parameter name.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// Value has the wrong type for its definition.
    #[error("parameter '{param}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Name of the parameter.
        param: String,
        /// Type declared by the definition.
        expected: ParamType,
        /// Type of the supplied value.
        found: ParamType,
    },

    /// Numeric value outside the declared range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value is not a member of the declared enum set.
    #[error("parameter '{param}' value '{value}' is not one of [{}]", allowed.join(", "))]
    InvalidEnum {
        /// Name of the parameter.
        param: String,
        /// The rejected value.
        value: String,
        /// Allowed values.
        allowed: Vec<String>,
    },

    /// Cascade pole count outside 1 to 4.
    #[error("invalid pole count {0}, expected 1 to 4")]
    InvalidPoleCount(i64),

    /// Definition violates its own constraints (e.g. default out of range).
    #[error("invalid definition for parameter '{param}': {reason}")]
    InvalidDefinition {
        /// Name of the parameter.
        param: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Collapse a list of errors: one error stays as-is, several become [`Multiple`](Self::Multiple).
    ///
    /// Returns `None` for an empty list.
    pub fn from_list(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ValidationError::Multiple(errors)),
        }
    }

    /// Name of the offending parameter, when the error concerns a single one.
    pub fn param(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownParameter(param)
            | ValidationError::TypeMismatch { param, .. }
            | ValidationError::OutOfRange { param, .. }
            | ValidationError::InvalidEnum { param, .. }
            | ValidationError::InvalidDefinition { param, .. } => Some(param),
            ValidationError::InvalidPoleCount(_) => Some("poles"),
            ValidationError::Multiple(_) => None,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
