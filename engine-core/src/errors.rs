//! The fixed error-code taxonomy shared by every crate in the workspace.
//!
//! Each crate defines its own `thiserror` enum for its own concerns and
//! implements [`ErrorCoded`] to map each variant onto one of these
//! codes. `engine`'s top-level error wraps all of them with `#[from]`.

use serde::{Deserialize, Serialize};

/// Stable, machine-matchable error codes. Names and meanings are fixed
/// by the engine's external contract — do not rename a variant without
/// updating every caller that matches on the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Validation,
    CircularDependency,
    NotFound,
    PermissionDenied,
    OutOfWorkspace,
    Conflict,
    ParseError,
    Transaction,
    Timeout,
    Cancelled,
    Io,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "Validation",
            ErrorCode::CircularDependency => "CircularDependency",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::OutOfWorkspace => "OutOfWorkspace",
            ErrorCode::Conflict => "Conflict",
            ErrorCode::ParseError => "ParseError",
            ErrorCode::Transaction => "Transaction",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::Cancelled => "Cancelled",
            ErrorCode::Io => "Io",
            ErrorCode::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every crate-local error enum so error reporting stays
/// uniform without each call site re-deriving the code by hand.
pub trait ErrorCoded {
    fn code(&self) -> ErrorCode;
}

/// The error envelope carried on a failed [`crate::model::OperationResult`],
/// matching spec §6's `{ message, code, details? }` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub code: ErrorCode,
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn from_error(err: &(impl ErrorCoded + std::fmt::Display)) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
