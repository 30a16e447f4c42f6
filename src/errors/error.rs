use std::fmt;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Backend (hosted database / transport) errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Conflict error: {0}")]
    Conflict(String),

    #[error("Server returned error {status}: {message}")]
    Server {
        status: u16,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether the failure looks like a dropped connection or a timeout.
    ///
    /// This is a message heuristic, not a deadline: any error whose rendered
    /// text mentions `connection` or `timeout` counts.
    pub fn is_transient(&self) -> bool {
        is_transient_message(&self.to_string())
    }
}

/// Message-based transient check shared by every error type that goes through
/// the retry helper.
pub fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("connection") || lowered.contains("timeout")
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        BackendError::Serialization(error.to_string())
    }
}

impl serde::Serialize for BackendError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let kind = match self {
            BackendError::Http(_) => "Http",
            BackendError::Connection(_) => "Connection",
            BackendError::Timeout(_) => "Timeout",
            BackendError::Query(_) => "Query",
            BackendError::Conflict(_) => "Conflict",
            BackendError::Server { .. } => "Server",
            BackendError::Serialization(_) => "Serialization",
            BackendError::Realtime(_) => "Realtime",
            BackendError::Other(_) => "Other",
        };
        let mut state = serializer.serialize_struct("BackendError", 2)?;
        state.serialize_field("type", kind)?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Manual Clone implementation for BackendError
impl Clone for BackendError {
    fn clone(&self) -> Self {
        match self {
            BackendError::Http(err) => {
                if err.is_timeout() {
                    BackendError::Timeout(err.to_string())
                } else if err.is_connect() {
                    BackendError::Connection(err.to_string())
                } else {
                    BackendError::Other(format!("HTTP error: {}", err))
                }
            }
            BackendError::Connection(s) => BackendError::Connection(s.clone()),
            BackendError::Timeout(s) => BackendError::Timeout(s.clone()),
            BackendError::Query(s) => BackendError::Query(s.clone()),
            BackendError::Conflict(s) => BackendError::Conflict(s.clone()),
            BackendError::Server { status, message } => BackendError::Server {
                status: *status,
                message: message.clone(),
            },
            BackendError::Serialization(s) => BackendError::Serialization(s.clone()),
            BackendError::Realtime(s) => BackendError::Realtime(s.clone()),
            BackendError::Other(s) => BackendError::Other(s.clone()),
        }
    }
}

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Entity not found: {0} with ID {1}")]
    EntityNotFound(String, Uuid),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Backend(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<BackendError> for ServiceError {
    fn from(error: BackendError) -> Self {
        ServiceError::Domain(DomainError::Backend(error))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        ServiceError::Domain(DomainError::Validation(error))
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' cannot exceed {max} characters")]
    MaxLength {
        field: String,
        max: usize,
    },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Self::MaxLength {
            field: field.to_string(),
            max,
        }
    }

    pub fn range<T: fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_detection() {
        assert!(BackendError::Connection("reset by peer".into()).is_transient());
        assert!(BackendError::Timeout("30s elapsed".into()).is_transient());
        assert!(BackendError::Other("upstream connection refused".into()).is_transient());
        assert!(!BackendError::Conflict("violates foreign key constraint".into()).is_transient());
        assert!(!BackendError::Query("column does not exist".into()).is_transient());
    }

    #[test]
    fn test_conflict_message_is_verbatim() {
        let err = ServiceError::from(BackendError::Conflict(
            "update or delete on table \"donation_types\" violates foreign key constraint".into(),
        ));
        assert!(err.to_string().contains("violates foreign key constraint"));
    }

    #[test]
    fn test_backend_error_serializes_type_and_message() {
        let json = serde_json::to_value(BackendError::Timeout("slow".into())).unwrap();
        assert_eq!(json["type"], "Timeout");
        assert_eq!(json["message"], "Request timeout: slow");
    }
}
