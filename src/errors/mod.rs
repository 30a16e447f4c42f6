mod error;

pub use error::{BackendError, DomainError, ServiceError, ValidationError, is_transient_message};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
