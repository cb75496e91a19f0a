use thiserror::Error;

use crate::domain::transfer::TransferStatus;

/// Every failure a service can report to a caller.
///
/// Messages are written for humans and never carry upstream response text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid status '{0}', expected one of: pending, arrived, picked_up, dropped_off")]
    InvalidStatus(String),

    #[error("cannot move a transfer from {from} to {to}; statuses advance one step at a time")]
    IllegalTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("transfer has no status history to undo")]
    EmptyHistory,

    #[error("the last status change can no longer be undone")]
    NotUndoable,

    #[error("{0}")]
    Refresh(String),

    #[error("{0}")]
    CrmAuthRequired(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable name used in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::InvalidStatus(_) => "invalid_status",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::EmptyHistory => "empty_history",
            Self::NotUndoable => "not_undoable",
            Self::Refresh(_) => "refresh_failed",
            Self::CrmAuthRequired(_) => "crm_auth_required",
            Self::Unauthorized(_) => "unauthorized",
            Self::Upstream(_) => "upstream",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }
}
