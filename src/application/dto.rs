use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AdminUser,
    crm::CrmConnection,
    domain::{
        errors::DomainError,
        transfer::{NewTransfer, Transfer, TransferListFilter, TransferStatus, parse_timestamp},
    },
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Admin form input. Every field is optional on the wire so that missing and
/// blank values produce the same validation error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_lead_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub pickup_time: Option<String>,
    #[serde(default)]
    pub drop_off_time: Option<String>,
    #[serde(default)]
    pub deal_id: Option<String>,
}

impl CreateTransferRequest {
    pub fn into_domain(self) -> Result<NewTransfer, DomainError> {
        let name = required(self.name, "name")?;
        let external_lead_id = required(self.external_lead_id, "externalLeadId")?;
        let location = required(self.location, "location")?;
        let pickup_raw = required(self.pickup_time, "pickupTime")?;
        let drop_off_raw = required(self.drop_off_time, "dropOffTime")?;

        let pickup_time = parse_timestamp(&pickup_raw).ok_or_else(|| {
            DomainError::validation("pickupTime must be an ISO-8601 date and time")
        })?;
        let drop_off_time = parse_timestamp(&drop_off_raw).ok_or_else(|| {
            DomainError::validation("dropOffTime must be an ISO-8601 date and time")
        })?;

        if drop_off_time <= pickup_time {
            return Err(DomainError::validation(
                "dropOffTime must be later than pickupTime",
            ));
        }

        Ok(NewTransfer {
            name,
            external_lead_id,
            location,
            pickup_time,
            drop_off_time,
            deal_id: self
                .deal_id
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, DomainError> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
        .ok_or_else(|| DomainError::validation(format!("{field} is required")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTransfersQueryRequest {
    #[serde(default)]
    pub status: Option<String>,
}

impl ListTransfersQueryRequest {
    pub fn into_domain(self) -> Result<TransferListFilter, DomainError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<TransferStatus>()?),
        };
        Ok(TransferListFilter { status })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoStatusRequest {
    #[serde(default)]
    pub target_status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemReportRequest {
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub current_status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemReportResponse {
    pub success: bool,
    pub message: &'static str,
    pub ticket_id: String,
}

/// A transfer as returned to admins and drivers, with the link the driver
/// opens to update it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    #[serde(flatten)]
    pub transfer: Transfer,
    pub driver_link: String,
}

impl TransferResponse {
    pub fn new(transfer: Transfer, public_base_url: &str) -> Self {
        let driver_link = driver_link(public_base_url, &transfer.id);
        Self {
            transfer,
            driver_link,
        }
    }
}

pub fn driver_link(public_base_url: &str, id: &str) -> String {
    format!("{}/transfer/{id}", public_base_url.trim_end_matches('/'))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: AdminUser,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AdminUser>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Connected CRM account as reported by `GET /crm/auth`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmStatusResponse {
    pub authenticated: bool,
    pub organization: String,
    pub user: String,
    pub api_domain: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in: i64,
    pub scopes: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmRefreshResponse {
    pub success: bool,
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrmCallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmCallbackResponse {
    pub success: bool,
    pub user_email: String,
    pub organization: String,
    pub api_domain: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

impl From<CrmConnection> for CrmCallbackResponse {
    fn from(value: CrmConnection) -> Self {
        Self {
            success: true,
            user_email: value.user_email,
            organization: value.organization,
            api_domain: value.api_domain,
            scope: value.scope,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealSearchQuery {
    #[serde(default)]
    pub lead_id: Option<String>,
}
