//! Error types for Huella operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for Huella operations.
///
/// Covers corpus loading, artifact persistence, and the schema-compatibility
/// checks that guard the train/predict boundary.
///
/// # Examples
///
/// ```
/// use huella::error::HuellaError;
///
/// let err = HuellaError::DimensionMismatch {
///     expected: "24 features".to_string(),
///     actual: "19 features".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug)]
pub enum HuellaError {
    /// Feature matrix / vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Corpus JSON could not be parsed.
    Corpus(String),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Invalid or corrupt model artifact.
    FormatError {
        /// Error description
        message: String,
    },

    /// Artifact was written by an unsupported format version.
    UnsupportedVersion {
        /// Version found
        found: u8,
        /// Maximum supported version
        supported: u8,
    },

    /// Artifact checksum verification failed.
    ChecksumMismatch {
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },

    /// Input validation failed (empty corpus, missing labels, etc.).
    ValidationError {
        /// Validation failure message
        message: String,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for HuellaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HuellaError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Feature dimension mismatch: expected {expected}, got {actual}"
                )
            }
            HuellaError::Io(e) => write!(f, "I/O error: {e}"),
            HuellaError::Corpus(msg) => write!(f, "Corpus error: {msg}"),
            HuellaError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            HuellaError::FormatError { message } => {
                write!(f, "Invalid artifact format: {message}")
            }
            HuellaError::UnsupportedVersion { found, supported } => {
                write!(
                    f,
                    "Unsupported artifact version: found {found}, max supported {supported}"
                )
            }
            HuellaError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "Checksum mismatch: expected 0x{expected:08X}, got 0x{actual:08X}"
                )
            }
            HuellaError::ValidationError { message } => {
                write!(f, "Validation failed: {message}")
            }
            HuellaError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for HuellaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HuellaError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HuellaError {
    fn from(err: std::io::Error) -> Self {
        HuellaError::Io(err)
    }
}

impl From<serde_json::Error> for HuellaError {
    fn from(err: serde_json::Error) -> Self {
        HuellaError::Corpus(err.to_string())
    }
}

impl From<&str> for HuellaError {
    fn from(msg: &str) -> Self {
        HuellaError::Other(msg.to_string())
    }
}

impl From<String> for HuellaError {
    fn from(msg: String) -> Self {
        HuellaError::Other(msg)
    }
}

impl HuellaError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::ValidationError {
            message: format!("empty input: {context}"),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, HuellaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = HuellaError::DimensionMismatch {
            expected: "24 features".to_string(),
            actual: "19 features".to_string(),
        };
        assert!(err.to_string().contains("dimension mismatch"));
        assert!(err.to_string().contains("24 features"));
        assert!(err.to_string().contains("19 features"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = HuellaError::ChecksumMismatch {
            expected: 0xDEAD_BEEF,
            actual: 0x0BAD_F00D,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xDEADBEEF"));
        assert!(msg.contains("0x0BADF00D"));
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = HuellaError::UnsupportedVersion {
            found: 9,
            supported: 1,
        };
        assert!(err.to_string().contains("found 9"));
        assert!(err.to_string().contains("max supported 1"));
    }

    #[test]
    fn test_io_error_source() {
        let err: HuellaError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing corpus").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("missing corpus"));
    }

    #[test]
    fn test_from_str_and_string() {
        let a: HuellaError = "plain message".into();
        let b: HuellaError = String::from("owned message").into();
        assert_eq!(a.to_string(), "plain message");
        assert_eq!(b.to_string(), "owned message");
    }

    #[test]
    fn test_validation_error_display() {
        let err = HuellaError::empty_input("training corpus");
        assert!(err.to_string().contains("Validation failed"));
        assert!(err.to_string().contains("training corpus"));
    }
}
