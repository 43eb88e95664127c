use thiserror::Error;

/// Star pointer error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StarPointerError {
    #[error("AR not supported")]
    Unsupported,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Failed to start session: {0}")]
    StartFailure(String),

    #[error("Sensor error: {0}")]
    TransientSensor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for star pointer operations
pub type PResult<T> = Result<T, StarPointerError>;

impl StarPointerError {
    /// Whether the error ends the current AR session attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StarPointerError::Unsupported
                | StarPointerError::Unauthorized(_)
                | StarPointerError::StartFailure(_)
        )
    }

    /// Message surfaced verbatim to the user for fatal startup failures.
    pub fn user_message(&self) -> String {
        match self {
            StarPointerError::Unsupported => "AR not supported".to_string(),
            StarPointerError::Unauthorized(_) => "camera access required".to_string(),
            StarPointerError::StartFailure(msg) => format!("failed to start session: {}", msg),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for StarPointerError {
    fn from(err: std::io::Error) -> Self {
        StarPointerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StarPointerError {
    fn from(err: serde_json::Error) -> Self {
        StarPointerError::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(StarPointerError::Unsupported.user_message(), "AR not supported");
        assert_eq!(
            StarPointerError::Unauthorized("camera".into()).user_message(),
            "camera access required"
        );
        assert_eq!(
            StarPointerError::StartFailure("sensor busy".into()).user_message(),
            "failed to start session: sensor busy"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(StarPointerError::Unsupported.is_fatal());
        assert!(StarPointerError::Unauthorized("camera".into()).is_fatal());
        assert!(StarPointerError::StartFailure("x".into()).is_fatal());
        assert!(!StarPointerError::TransientSensor("interference".into()).is_fatal());
    }
}
