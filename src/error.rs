use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing names, resolving sessions and assembling trials.
#[derive(Error, Debug)]
pub enum AlfError {
    #[error("Not an ALF filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid experiment reference: {0}")]
    InvalidReference(String),

    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Row-count mismatch between trial columns. Never truncated or padded.
    #[error("Inconsistent trial data: column '{column}' has {found} rows, expected {expected}")]
    InconsistentData {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Trial table has no '{0}' column")]
    MissingColumn(String),

    #[error("Unsupported payload format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed payload in {path}: {reason}")]
    MalformedPayload { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl AlfError {
    /// Whether the error comes from a malformed filename or reference string.
    /// Callers iterating over many names usually skip these and carry on.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            AlfError::InvalidFilename(_) | AlfError::InvalidReference(_)
        )
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        AlfError::MalformedPayload {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_classified() {
        assert!(AlfError::InvalidFilename("config.txt".into()).is_parse_error());
        assert!(AlfError::InvalidReference("nope".into()).is_parse_error());
        assert!(!AlfError::NotFound(PathBuf::from("/x")).is_parse_error());
    }

    #[test]
    fn inconsistent_data_message_names_column() {
        let err = AlfError::InconsistentData {
            column: "choice".into(),
            expected: 10,
            found: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("choice"));
        assert!(msg.contains("9 rows"));
        assert!(msg.contains("expected 10"));
    }
}
