use std::fmt;
use serde::{Deserialize, Serialize};
use crate::errors::{DomainError, DbError, ServiceError, ValidationError};

/// Error codes for FFI boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Success (no error)
    Success = 0,

    // General errors (1-99)
    Unknown = 1,
    InvalidArgument = 2,
    NullPointer = 3,
    InvalidUtf8 = 4,
    InvalidUuid = 5,
    InternalError = 6,

    // Database errors (100-199)
    DatabaseGeneral = 100,
    DatabaseConnection = 104,
    DatabaseTransaction = 105,
    DatabaseMigration = 106,

    // Domain errors (200-299)
    DomainGeneral = 200,
    EntityNotFound = 201,
    AuthorizationFailed = 202,
    ValidationFailed = 204,
    InvalidPermissionValue = 209,
    UnknownSection = 210,

    // Service errors (300-399)
    ServiceGeneral = 300,
    AuthenticationFailed = 303,
    PermissionDenied = 305,
    OfflineFeatureUnavailable = 306,
    NetworkError = 308,
    ConfigurationError = 310,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// Error type for FFI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FFIError {
    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (JSON string)
    pub details: Option<String>,
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for FFIError {}

impl FFIError {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: &str, details: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    // Helper for internal errors
    pub fn internal(message: String) -> Self {
        Self::new(ErrorCode::InternalError, &message)
    }
}

// Implement From traits for converting domain errors to FFI errors

impl From<DbError> for FFIError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(sqlx_err) => {
                Self::new(ErrorCode::DatabaseGeneral, &sqlx_err.to_string())
            },
            DbError::ConnectionPool(msg) => Self::new(ErrorCode::DatabaseConnection, &msg),
            DbError::Transaction(msg) => Self::new(ErrorCode::DatabaseTransaction, &msg),
            DbError::Migration(msg) => Self::new(ErrorCode::DatabaseMigration, &msg),
            DbError::Other(msg) => Self::new(ErrorCode::DatabaseGeneral, &msg),
        }
    }
}

impl From<DomainError> for FFIError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Database(db_err) => {
                db_err.into() // Delegate to From<DbError>
            },
            DomainError::EntityNotFound(entity, id) => {
                Self::with_details(
                    ErrorCode::EntityNotFound,
                    &format!("Entity not found: {} with ID {}", entity, id),
                    &serde_json::json!({ "entity": entity, "id": id.to_string() }).to_string()
                )
            },
            DomainError::AuthorizationFailed(msg) => {
                Self::new(ErrorCode::AuthorizationFailed, &msg)
            },
            DomainError::InvalidUuid(uuid_str) => {
                Self::with_details(
                    ErrorCode::InvalidUuid,
                    &format!("Invalid UUID: {}", uuid_str),
                    &serde_json::json!({ "uuid": uuid_str }).to_string()
                )
            },
            DomainError::InvalidPermissionValue(value) => {
                Self::with_details(
                    ErrorCode::InvalidPermissionValue,
                    &format!("Invalid permission value: {}", value),
                    &serde_json::json!({ "value": value }).to_string()
                )
            },
            DomainError::UnknownSection(section) => {
                Self::with_details(
                    ErrorCode::UnknownSection,
                    &format!("Unknown section: {}", section),
                    &serde_json::json!({ "section": section }).to_string()
                )
            },
            DomainError::Validation(val_err) => {
                val_err.into() // Delegate to From<ValidationError>
            },
            DomainError::Internal(msg) => {
                Self::new(ErrorCode::InternalError, &msg)
            },
            DomainError::External(msg) => {
                Self::new(ErrorCode::InternalError, &format!("External error: {}", msg))
            },
        }
    }
}

impl From<ServiceError> for FFIError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(domain_err) => {
                domain_err.into() // Delegate
            },
            ServiceError::Authentication(msg) => {
                Self::new(ErrorCode::AuthenticationFailed, &msg)
            },
            ServiceError::PermissionDenied(msg) => {
                Self::new(ErrorCode::PermissionDenied, &msg)
            },
            ServiceError::OfflineFeatureUnavailable(feature) => {
                Self::with_details(
                    ErrorCode::OfflineFeatureUnavailable,
                    &format!("Feature not available in offline mode: {}", feature),
                    &serde_json::json!({ "feature": feature }).to_string()
                )
            },
            ServiceError::Network(msg) => {
                Self::new(ErrorCode::NetworkError, &msg)
            },
            ServiceError::Configuration(msg) => {
                Self::new(ErrorCode::ConfigurationError, &msg)
            },
        }
    }
}

impl From<ValidationError> for FFIError {
    fn from(err: ValidationError) -> Self {
        let details = match &err {
            ValidationError::Required { field } => {
                serde_json::json!({ "field": field, "type": "required" })
            },
            ValidationError::MaxLength { field, max } => {
                serde_json::json!({ "field": field, "type": "max_length", "max": max })
            },
            ValidationError::Range { field, min, max } => {
                serde_json::json!({ "field": field, "type": "range", "min": min, "max": max })
            },
            ValidationError::Format { field, reason } => {
                serde_json::json!({ "field": field, "type": "format", "reason": reason })
            },
            ValidationError::InvalidValue { field, reason } => {
                serde_json::json!({ "field": field, "type": "invalid_value", "reason": reason })
            },
            ValidationError::Custom(msg) => {
                serde_json::json!({ "type": "custom", "message": msg })
            },
        };
        Self::with_details(ErrorCode::ValidationFailed, &err.to_string(), &details.to_string())
    }
}

impl From<std::ffi::NulError> for FFIError {
    fn from(_: std::ffi::NulError) -> Self {
        Self::new(ErrorCode::InvalidUtf8, "String contains null bytes, cannot create CString")
    }
}

// Result type alias for FFI functions
pub type FFIResult<T> = Result<T, FFIError>;
