//! Error taxonomy for cash registry operations.
//!
//! Validation failures carry the name of the form field they belong to so
//! the UI can render them inline; connectivity and authorization failures
//! are kept distinct from a plain rejected request.

use chrono::NaiveDate;

use crate::shifts::ShiftType;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("A {shift} balance has already been recorded for {date}")]
    DuplicateShift { date: NaiveDate, shift: ShiftType },

    #[error("The {missing} balance for {date} has not been recorded yet")]
    MissingBalance { date: NaiveDate, missing: ShiftType },

    #[error("Cash registry for {date} is already verified")]
    AlreadyVerified { date: NaiveDate },

    #[error("Only a manager or owner can delete a verified entry")]
    PrivilegeRequired,

    #[error("Deleting a verified entry must be confirmed explicitly")]
    ConfirmationRequired,

    #[error("Shift entry not found: {0}")]
    EntryNotFound(String),

    #[error("Cash registry service is unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Your session has expired, please sign in again")]
    Unauthorized,

    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from cash registry service: {0}")]
    UnexpectedResponse(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Form field the error should be rendered against, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            Self::DuplicateShift { .. } => Some("shiftType"),
            Self::MissingBalance { missing, .. } => Some(match missing {
                ShiftType::Opening => "openingBalance",
                ShiftType::Closing => "closingBalance",
            }),
            Self::AlreadyVerified { .. } | Self::PrivilegeRequired => Some("isVerified"),
            Self::ConfirmationRequired => Some("confirm"),
            Self::EntryNotFound(_) => Some("id"),
            Self::ServiceUnavailable(_)
            | Self::Unauthorized
            | Self::Rejected { .. }
            | Self::UnexpectedResponse(_) => None,
        }
    }

    /// Validation errors are caught before any write reaches the backend.
    pub fn is_validation(&self) -> bool {
        self.field().is_some()
    }
}
