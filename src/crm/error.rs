use thiserror::Error;

use crate::domain::errors::DomainError;

/// Failures talking to the CRM or its token storage.
///
/// These carry upstream detail for logs; callers outside the crate see them
/// only after conversion into [`DomainError`].
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("crm request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("crm responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("crm response could not be decoded: {0}")]
    Decode(String),

    #[error("crm rejected the request: {0}")]
    Rejected(String),

    #[error("crm connection is not authenticated")]
    NotAuthenticated,

    #[error("no refresh token is stored")]
    MissingRefreshToken,

    #[error("crm client is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("token store error: {0}")]
    TokenStore(String),
}

impl CrmError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. } | Self::NotAuthenticated)
    }
}

impl From<CrmError> for DomainError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::NotAuthenticated | CrmError::Status { status: 401, .. } => {
                DomainError::CrmAuthRequired("CRM authentication required".to_string())
            }
            CrmError::MissingRefreshToken => {
                DomainError::Refresh("no CRM refresh token available".to_string())
            }
            CrmError::NotConfigured(what) => {
                DomainError::internal(format!("CRM integration is not configured: {what}"))
            }
            CrmError::TokenStore(_) => DomainError::storage("CRM token storage failed"),
            CrmError::Transport(_)
            | CrmError::Status { .. }
            | CrmError::Decode(_)
            | CrmError::Rejected(_) => {
                DomainError::Upstream("CRM service is unavailable".to_string())
            }
        }
    }
}
