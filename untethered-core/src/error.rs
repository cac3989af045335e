//! Error types for the untethered ecosystem.

use thiserror::Error;

/// Errors that can occur in untethered operations.
#[derive(Error, Debug)]
pub enum UntetheredError {
    #[error("Monthly goal already set for {0}")]
    AlreadySet(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Client-side validation failures, raised before any backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid period '{0}'. Expected MM/YYYY")]
    InvalidPeriod(String),

    #[error("Invalid goal key '{0}'")]
    InvalidGoalKey(String),

    #[error("Week index {0} is out of range (0-3)")]
    WeekOutOfRange(usize),

    #[error("Invalid document key '{0}'")]
    InvalidDocumentKey(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("File size must be less than {0}MB")]
    FileTooLarge(u64),

    #[error("Please select a valid file type (image, video, or PDF)")]
    DisallowedFileType(String),

    #[error("Please provide either a link or upload a file")]
    LinkOrFileRequired,

    #[error("A {kind} already exists for {date}")]
    DuplicateBooking { kind: String, date: String },
}

impl UntetheredError {
    pub(crate) fn backend(e: impl std::fmt::Display) -> Self {
        UntetheredError::BackendUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for UntetheredError {
    fn from(e: std::io::Error) -> Self {
        UntetheredError::backend(e)
    }
}

impl From<serde_json::Error> for UntetheredError {
    fn from(e: serde_json::Error) -> Self {
        UntetheredError::BackendUnavailable(format!("malformed document: {e}"))
    }
}

/// Result type alias for untethered operations.
pub type UntetheredResult<T> = Result<T, UntetheredError>;
