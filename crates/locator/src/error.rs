//! Error types for the locator

use geofinder_core::validation::ValidationResult;
use thiserror::Error;

/// Result type for locator operations
pub type Result<T> = std::result::Result<T, LocatorError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LocatorErrorCode {
    InvalidInput = 20001,
    StoreUnavailable = 20002,
    StoreWriteFailed = 20003,
    StoreReadFailed = 20004,
    PayloadParseFailed = 20005,
}

/// Locator errors
///
/// Only `InvalidInput` reaches callers of the engine. Store failures are
/// absorbed by routing to the fallback store; parse failures drop one row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocatorError {
    /// Caller data breaks one or more domain rules, all of them listed
    #[error("invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    /// Connect, ping or transport failure
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A reachable store rejected a write
    #[error("store write failed: {0}")]
    StoreWriteFailed(String),

    /// A reachable store rejected a read
    #[error("store read failed: {0}")]
    StoreReadFailed(String),

    /// A member payload is not a valid place record
    #[error("payload parse failed: {0}")]
    PayloadParseFailed(String),
}

impl LocatorError {
    /// Get the error code
    pub fn code(&self) -> LocatorErrorCode {
        match self {
            Self::InvalidInput(_) => LocatorErrorCode::InvalidInput,
            Self::StoreUnavailable(_) => LocatorErrorCode::StoreUnavailable,
            Self::StoreWriteFailed(_) => LocatorErrorCode::StoreWriteFailed,
            Self::StoreReadFailed(_) => LocatorErrorCode::StoreReadFailed,
            Self::PayloadParseFailed(_) => LocatorErrorCode::PayloadParseFailed,
        }
    }

    /// True for failures that the engine answers by switching to the fallback
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::StoreWriteFailed(_) | Self::StoreReadFailed(_)
        )
    }

    /// Messages for `InvalidInput`, empty for everything else
    pub fn violations(&self) -> &[String] {
        match self {
            Self::InvalidInput(messages) => messages,
            _ => &[],
        }
    }
}

impl From<ValidationResult> for LocatorError {
    fn from(result: ValidationResult) -> Self {
        Self::InvalidInput(result.messages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofinder_core::validation::validate_new_place;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LocatorError::InvalidInput(vec![]).code() as u32,
            20001
        );
        assert_eq!(
            LocatorError::PayloadParseFailed("x".into()).code() as u32,
            20005
        );
    }

    #[test]
    fn test_store_failures() {
        assert!(LocatorError::StoreUnavailable("down".into()).is_store_failure());
        assert!(LocatorError::StoreReadFailed("bad".into()).is_store_failure());
        assert!(!LocatorError::InvalidInput(vec![]).is_store_failure());
        assert!(!LocatorError::PayloadParseFailed("x".into()).is_store_failure());
    }

    #[test]
    fn test_from_validation_keeps_every_message() {
        let err = LocatorError::from(validate_new_place("", " ", 95.0, 200.0));
        assert_eq!(err.violations().len(), 4);
        assert!(err.to_string().starts_with("invalid input: name: is required"));
    }
}
