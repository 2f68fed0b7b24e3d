//! Error types for the range service
//!
//! Validation failures, store conflicts and quota rejections stay distinct
//! all the way to the HTTP boundary, where they are rendered into status
//! codes by `crate::http::error`.

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RangeError>;

/// Field-level validation failures raised while building domain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} must not be blank")]
    BlankField { field: String },

    #[error("{field} must contain at least one element")]
    EmptyList { field: String },

    #[error("Invalid value '{token}' for {field}")]
    InvalidEnumValue { field: String, token: String },

    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    #[error("'{id}' is not a valid range id")]
    InvalidId { id: String },

    #[error("Malformed request body: {reason}")]
    MalformedBody { reason: String },
}

impl ValidationError {
    /// Path of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::BlankField { field }
            | ValidationError::EmptyList { field }
            | ValidationError::InvalidEnumValue { field, .. }
            | ValidationError::NotFinite { field } => Some(field),
            ValidationError::InvalidId { .. } => Some("id"),
            ValidationError::MalformedBody { .. } => None,
        }
    }
}

/// Errors surfaced by the range store and range service
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("A range named '{name}' already exists")]
    DuplicateKey { name: String },

    #[error("User {user_id} has reached the maximum limit of {limit} ranges")]
    QuotaExceeded { user_id: String, limit: usize },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl RangeError {
    /// Short machine-readable kind, used for error bodies and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            RangeError::Validation(_) => "validation_failed",
            RangeError::DuplicateKey { .. } => "duplicate_name",
            RangeError::QuotaExceeded { .. } => "quota_exceeded",
            RangeError::StorageUnavailable { .. } => "storage_unavailable",
            RangeError::InternalError { .. } => "internal_error",
        }
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        RangeError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}
