use thiserror::Error;

/// Common error type for calls against the delivery backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Network error (connection refused, timeout, DNS failure)
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication error (rejected or expired bearer token)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The requested assignment is not in the carrier's list
    #[error("Assignment not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend rejected the request
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

/// Result type alias using ServiceError
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ServiceError = json_err.into();

        match err {
            ServiceError::Serialization(msg) => {
                assert!(msg.contains("expected value"), "Error message should contain the original error");
            }
            _ => panic!("Expected Serialization variant"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::Backend { status: 400, message: "Error checklist".to_string() };
        assert_eq!(format!("{}", err), "Backend error (400): Error checklist");

        let err = ServiceError::NotFound("assignment 17".to_string());
        assert_eq!(format!("{}", err), "Assignment not found: assignment 17");
    }
}
