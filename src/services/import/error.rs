use thiserror::Error;

pub const CONVERT_SUGGESTION: &str =
    "Try saving the file as .xlsx or .csv (UTF-8) and upload it again.";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No file provided")]
    MissingFile,

    #[error("File is empty")]
    EmptyFile,

    #[error("File size {size} bytes exceeds the maximum of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Could not read file: {detail}. {suggestion}")]
    Unparseable {
        detail: String,
        suggestion: &'static str,
    },

    #[error("No valid client records found: {0}")]
    NoValidRecords(String),

    #[error("Too many rows: {count} exceeds the limit of {limit}")]
    TooManyRows { count: usize, limit: usize },

    #[error("Invalid session id: must be 10-50 letters, digits, '-' or '_'")]
    InvalidSessionId,

    #[error("Upload session conflict: {0}")]
    SessionConflict(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Import task failed: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn unparseable(detail: impl std::fmt::Display) -> Self {
        ImportError::Unparseable {
            detail: detail.to_string(),
            suggestion: CONVERT_SUGGESTION,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MissingFile => "MISSING_FILE",
            ImportError::EmptyFile => "EMPTY_FILE",
            ImportError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ImportError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ImportError::Unparseable { .. } => "UNPARSEABLE_FILE",
            ImportError::NoValidRecords(_) => "NO_VALID_RECORDS",
            ImportError::TooManyRows { .. } => "TOO_MANY_ROWS",
            ImportError::InvalidSessionId => "INVALID_SESSION_ID",
            ImportError::SessionConflict(_) => "SESSION_CONFLICT",
            ImportError::InvalidRequest(_) => "INVALID_REQUEST",
            ImportError::Internal(_) => "INTERNAL",
        }
    }
}
