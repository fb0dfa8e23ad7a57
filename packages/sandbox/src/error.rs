// ABOUTME: Error types for sandboxed build orchestration
// ABOUTME: Separates caller-attributable validation failures from container runtime failures

use thiserror::Error;

/// Request rejected before any sandbox is created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Framework key does not match any known profile
    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    /// Source text missing or blank
    #[error("Source code is required")]
    MissingSource,

    /// Source text larger than the configured ceiling
    #[error("Source code is {size} bytes, exceeding the {limit} byte limit")]
    SourceTooLarge { size: usize, limit: usize },

    /// Numeric limit override that is non-numeric, non-finite or not positive
    #[error("Invalid value for {field}: {reason}")]
    InvalidLimit { field: &'static str, reason: String },
}

impl ValidationError {
    /// Wire name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UnknownFramework(_) => "framework",
            ValidationError::MissingSource | ValidationError::SourceTooLarge { .. } => {
                "sourceCode"
            }
            ValidationError::InvalidLimit { field, .. } => field,
        }
    }
}

/// Failure talking to the container engine
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Image not found locally: {0}")]
    ImageNotFound(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_limit_names_field() {
        let error = ValidationError::InvalidLimit {
            field: "cpuQuota",
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(error.field(), "cpuQuota");
        assert!(error.to_string().contains("cpuQuota"));
    }

    #[test]
    fn test_source_errors_point_at_source_field() {
        assert_eq!(ValidationError::MissingSource.field(), "sourceCode");
        let too_large = ValidationError::SourceTooLarge { size: 10, limit: 5 };
        assert_eq!(too_large.field(), "sourceCode");
        assert!(too_large.to_string().contains("10 bytes"));
    }
}
