use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// Position of a transfer in its pickup/drop-off lifecycle.
///
/// Variants are declared in lifecycle order, so the derived `Ord` is the
/// lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Arrived,
    PickedUp,
    DroppedOff,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 4] = [
        TransferStatus::Pending,
        TransferStatus::Arrived,
        TransferStatus::PickedUp,
        TransferStatus::DroppedOff,
    ];

    pub fn order(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Arrived => 1,
            Self::PickedUp => 2,
            Self::DroppedOff => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Arrived => "arrived",
            Self::PickedUp => "picked_up",
            Self::DroppedOff => "dropped_off",
        }
    }

    /// The only status `advance` accepts from `self`; `None` once terminal.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Arrived),
            Self::Arrived => Some(Self::PickedUp),
            Self::PickedUp => Some(Self::DroppedOff),
            Self::DroppedOff => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::DroppedOff
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| DomainError::InvalidStatus(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: TransferStatus,
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub can_undo: bool,
    #[serde(default)]
    pub is_undo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub name: String,
    pub external_lead_id: String,
    pub location: String,
    pub pickup_time: DateTime<Utc>,
    pub drop_off_time: DateTime<Utc>,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<String>,
    pub version: i64,
}

impl Transfer {
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

/// Validated input for a brand-new transfer.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub name: String,
    pub external_lead_id: String,
    pub location: String,
    pub pickup_time: DateTime<Utc>,
    pub drop_off_time: DateTime<Utc>,
    pub deal_id: Option<String>,
}

impl NewTransfer {
    pub fn build(self, now: DateTime<Utc>) -> Transfer {
        Transfer {
            id: generate_transfer_id(),
            name: self.name,
            external_lead_id: self.external_lead_id,
            location: self.location,
            pickup_time: self.pickup_time,
            drop_off_time: self.drop_off_time,
            status: TransferStatus::Pending,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            deal_id: self.deal_id,
            version: 1,
        }
    }
}

pub fn generate_transfer_id() -> String {
    format!("TR-{}", Uuid::new_v4().simple())
}

/// Parses RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Default)]
pub struct TransferListFilter {
    pub status: Option<TransferStatus>,
}
