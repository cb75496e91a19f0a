use serde::{Deserialize, Serialize};

/// CRM deal normalized into the shape the admin UI prefills transfers from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub lead_id: String,
    pub deal_name: String,
    pub contact_name: String,
    pub account_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub stage: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealSource {
    CrmApi,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealSearchResult {
    pub deals: Vec<Deal>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DealSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DealSearchResult {
    pub fn empty() -> Self {
        Self {
            deals: Vec::new(),
            total: 0,
            source: None,
            warning: None,
        }
    }
}

pub const MAX_DEAL_RESULTS: usize = 10;
pub const MIN_LEAD_ID_LEN: usize = 3;

/// Puts exact lead-id matches first, keeps the remaining order, and caps the
/// list. Returns the ranked page together with the uncapped count.
pub fn rank_deals(deals: Vec<Deal>, lead_id: &str) -> (Vec<Deal>, usize) {
    let total = deals.len();
    let (mut ranked, partial): (Vec<Deal>, Vec<Deal>) =
        deals.into_iter().partition(|deal| deal.lead_id == lead_id);
    ranked.extend(partial);
    ranked.truncate(MAX_DEAL_RESULTS);
    (ranked, total)
}
