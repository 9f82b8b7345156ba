use thiserror::Error;

use crate::{diagnostics::PermissionDiagnostic, store::StoreError, validation::FieldErrors};

pub const REVIEW_ENTRIES: &str = "Please review your entries and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Rejected,
    NotFound,
    Permission,
    Transient,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    /// Bulk import refused before any write.
    #[error("{message}")]
    InvalidBatch { message: String, errors: Vec<String> },

    #[error("{message}")]
    Conflict { message: String, errors: FieldErrors },

    #[error("Sorry, registration is currently closed.")]
    RegistrationClosed,

    #[error("{0}")]
    Rejected(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Permission(PermissionDiagnostic),

    #[error("Store failure: {0}")]
    Store(#[source] StoreError),

    #[error("Malformed document {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LedgerError {
    pub fn validation(errors: FieldErrors) -> Self {
        LedgerError::Validation {
            message: REVIEW_ENTRIES.to_string(),
            errors,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        LedgerError::Rejected(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. } | LedgerError::InvalidBatch { .. } => {
                ErrorKind::Validation
            }
            LedgerError::Conflict { .. } => ErrorKind::Conflict,
            LedgerError::RegistrationClosed | LedgerError::Rejected(_) => ErrorKind::Rejected,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::Permission(_) => ErrorKind::Permission,
            LedgerError::Store(_) | LedgerError::Decode { .. } => ErrorKind::Transient,
        }
    }
}
