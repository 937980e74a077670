//! Error types for query building.

use std::fmt;
use thiserror::Error;

/// Action that was refused on a known field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Filter,
    Sort,
    Group,
    /// The filter operator itself is not recognised.
    Operator(String),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Filter => write!(f, "filter"),
            Operation::Sort => write!(f, "sort"),
            Operation::Group => write!(f, "group"),
            Operation::Operator(op) => write!(f, "operator '{}'", op),
        }
    }
}

/// The main error type for query building.
///
/// Every variant is a caller mistake, never a transient fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Logical field is not in the registry.
    #[error("Unknown field: '{field}'")]
    Field { field: String },

    /// Field is known but the action is not permitted on it.
    #[error("Operation not allowed: {operation} on field '{field}'")]
    Operation { field: String, operation: Operation },

    /// Missing or unsupported value for the operator.
    #[error("Invalid value for field '{field}': {reason}")]
    Value { field: String, reason: String },

    /// List element with a type outside string/int/float.
    #[error("Invalid list element for field '{field}': type {found} is not allowed")]
    Slice { field: String, found: &'static str },

    /// Sort direction other than asc/desc.
    #[error("Invalid sort direction for field '{field}': '{dir}'")]
    Dir { field: String, dir: String },

    /// Descriptor parameter is not valid (URL-encoded) JSON.
    #[error("Failed to decode '{param}': {reason}")]
    Decode { param: String, reason: String },

    /// Placeholder/argument mismatch or an empty IN-list.
    #[error("Rebind error: {0}")]
    Rebind(String),
}

/// Fieldless discriminant of [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Field,
    Operation,
    Value,
    Slice,
    Dir,
    Decode,
    Rebind,
}

impl QueryError {
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
        }
    }

    pub fn not_allowed(field: impl Into<String>, operation: Operation) -> Self {
        Self::Operation {
            field: field.into(),
            operation,
        }
    }

    pub fn value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Value {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn rebind(message: impl Into<String>) -> Self {
        Self::Rebind(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Field { .. } => ErrorKind::Field,
            Self::Operation { .. } => ErrorKind::Operation,
            Self::Value { .. } => ErrorKind::Value,
            Self::Slice { .. } => ErrorKind::Slice,
            Self::Dir { .. } => ErrorKind::Dir,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Rebind(_) => ErrorKind::Rebind,
        }
    }

    /// Logical field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Field { field }
            | Self::Operation { field, .. }
            | Self::Value { field, .. }
            | Self::Slice { field, .. }
            | Self::Dir { field, .. } => Some(field),
            Self::Decode { .. } | Self::Rebind(_) => None,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Operation => 403,
            ErrorKind::Field
            | ErrorKind::Value
            | ErrorKind::Slice
            | ErrorKind::Dir
            | ErrorKind::Decode => 400,
            ErrorKind::Rebind => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::Rebind
    }
}

/// Result type alias for query building.
pub type QueryResult<T> = Result<T, QueryError>;
