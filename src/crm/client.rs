//! REST client for the CRM's OAuth and deals endpoints.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::crm::config::{
    CrmConfig, EXPIRY_SAFETY_BUFFER_SECS, MAX_TOKEN_LIFETIME_SECS, api_domain_for_country,
};
use crate::crm::error::CrmError;
use crate::crm::fixtures::matching_fallback_deals;
use crate::crm::token_store::{CrmTokens, TokenStore};
use crate::domain::deal::{Deal, DealSearchResult, DealSource, MIN_LEAD_ID_LEN, rank_deals};

pub const FALLBACK_WARNING: &str = "Using sample data - CRM API unavailable";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    error: Option<String>,
}

/// Account details returned by the CRM for an access token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrmUserInfo {
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "Display_Name", default)]
    pub display_name: String,
    #[serde(rename = "ZUID", default)]
    zuid: Option<Value>,
    #[serde(rename = "Country", default)]
    pub country: String,
}

impl CrmUserInfo {
    pub fn user_id(&self) -> Option<String> {
        match self.zuid.as_ref()? {
            Value::String(raw) if !raw.is_empty() => Some(raw.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

/// Summary of a freshly established CRM connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConnection {
    pub user_email: String,
    pub organization: String,
    pub api_domain: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

pub struct CrmClient {
    http: reqwest::Client,
    config: CrmConfig,
    tokens: Arc<dyn TokenStore>,
}

impl CrmClient {
    pub fn new(config: CrmConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Consent page URL the admin's browser is sent to.
    pub fn authorization_url(&self, state: &str) -> Result<String, CrmError> {
        let url = Url::parse_with_params(
            &self.config.accounts_endpoint("/oauth/v2/auth"),
            &[
                ("scope", self.config.scope.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
                ("prompt", "consent"),
            ],
        )
        .map_err(|_| CrmError::NotConfigured("accounts url is not a valid URL"))?;
        Ok(url.into())
    }

    /// Trades an authorization code for tokens and stores them.
    pub async fn exchange_code(&self, code: &str) -> Result<CrmConnection, CrmError> {
        self.ensure_configured()?;

        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code", code),
            ])
            .await?;
        let access_token = token
            .access_token
            .ok_or_else(|| CrmError::Decode("token response carried no access token".into()))?;

        let user = match self.user_info(&access_token).await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "crm user info unavailable after code exchange");
                CrmUserInfo::default()
            }
        };

        let api_domain = api_domain_for_country(&user.country).to_string();
        let expires_at = expiry_from(Utc::now(), token.expires_in);
        let scope = token.scope.unwrap_or_default();

        self.tokens
            .set(CrmTokens {
                access_token,
                refresh_token: token.refresh_token.unwrap_or_default(),
                expires_at: Some(expires_at),
                organization_id: user.user_id().unwrap_or_else(|| "unknown".to_string()),
                user_email: user.email.clone(),
                api_domain: api_domain.clone(),
                scope: scope.clone(),
            })
            .await?;

        info!(user_email = %user.email, api_domain = %api_domain, "crm connection established");

        Ok(CrmConnection {
            user_email: user.email,
            organization: user.display_name,
            api_domain,
            scope,
            expires_at,
        })
    }

    /// Exchanges the stored refresh token for a new access token.
    pub async fn refresh(&self) -> Result<CrmTokens, CrmError> {
        self.ensure_configured()?;

        let mut tokens = self.tokens.get().await?;
        if !tokens.has_refresh_token() {
            return Err(CrmError::MissingRefreshToken);
        }

        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", tokens.refresh_token.as_str()),
            ])
            .await?;
        let access_token = token
            .access_token
            .ok_or_else(|| CrmError::Decode("refresh response carried no access token".into()))?;

        tokens.access_token = access_token;
        tokens.expires_at = Some(expiry_from(Utc::now(), token.expires_in));
        if let Some(rotated) = token.refresh_token.filter(|value| !value.is_empty()) {
            tokens.refresh_token = rotated;
        }

        self.tokens.set(tokens.clone()).await?;
        info!(expires_at = ?tokens.expires_at, "crm access token refreshed");
        Ok(tokens)
    }

    pub async fn user_info(&self, access_token: &str) -> Result<CrmUserInfo, CrmError> {
        let response = self
            .http
            .get(self.config.accounts_endpoint("/oauth/user/info"))
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {access_token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let response = ensure_success(response).await?;
        response
            .json::<CrmUserInfo>()
            .await
            .map_err(|err| CrmError::Decode(err.to_string()))
    }

    /// Revokes the access token upstream (best effort) and clears the store.
    pub async fn revoke(&self) -> Result<(), CrmError> {
        let tokens = self.tokens.get().await?;
        if !tokens.access_token.is_empty() {
            let outcome = self
                .http
                .post(self.config.accounts_endpoint("/oauth/v2/token/revoke"))
                .form(&[("token", tokens.access_token.as_str())])
                .send()
                .await;
            match outcome {
                Ok(response) if response.status().is_success() => {
                    debug!("crm token revoked");
                }
                Ok(response) => {
                    warn!(status = response.status().as_u16(), "crm token revocation rejected");
                }
                Err(err) => {
                    warn!(error = %err, "crm token revocation failed");
                }
            }
        }

        self.tokens.clear().await
    }

    /// Looks up deals by lead id, degrading to sample data when the CRM fails.
    ///
    /// Lead ids shorter than three characters return an empty result without
    /// touching the token store or the network.
    pub async fn search_deals(&self, raw_lead_id: &str) -> Result<DealSearchResult, CrmError> {
        let lead_id = raw_lead_id.trim().to_uppercase();
        if lead_id.chars().count() < MIN_LEAD_ID_LEN {
            return Ok(DealSearchResult::empty());
        }

        let tokens = self.tokens.get().await?;
        if !tokens.is_valid_at(Utc::now()) {
            return Err(CrmError::NotAuthenticated);
        }

        match self.fetch_deals(&tokens, &lead_id).await {
            Ok(deals) => {
                let (deals, total) = rank_deals(deals, &lead_id);
                Ok(DealSearchResult {
                    deals,
                    total,
                    source: Some(DealSource::CrmApi),
                    warning: None,
                })
            }
            Err(err) if err.is_unauthorized() => Err(err),
            Err(err) => {
                warn!(error = %err, lead_id = %lead_id, "crm deal search failed, serving sample deals");
                let (deals, total) = rank_deals(matching_fallback_deals(&lead_id), &lead_id);
                Ok(DealSearchResult {
                    deals,
                    total,
                    source: Some(DealSource::Fallback),
                    warning: Some(FALLBACK_WARNING.to_string()),
                })
            }
        }
    }

    async fn fetch_deals(&self, tokens: &CrmTokens, lead_id: &str) -> Result<Vec<Deal>, CrmError> {
        let url = format!(
            "{}/crm/v2/Deals/search",
            self.config.api_base_for(&tokens.api_domain)
        );
        let criteria = format!("(Lead_ID:contains:{lead_id})");

        let response = self
            .http
            .get(url)
            .query(&[("criteria", criteria.as_str())])
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {}", tokens.access_token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let payload: Value = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| CrmError::Decode(err.to_string()))?;

        let records = payload
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        debug!(lead_id, records = records.len(), "crm deal search answered");
        Ok(records.iter().map(deal_from_record).collect())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, CrmError> {
        let response = self
            .http
            .post(self.config.accounts_endpoint("/oauth/v2/token"))
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;

        let token: TokenResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| CrmError::Decode(err.to_string()))?;

        if let Some(error) = token.error {
            return Err(CrmError::Rejected(error));
        }
        Ok(token)
    }

    fn ensure_configured(&self) -> Result<(), CrmError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(CrmError::NotConfigured("client id and secret are required"))
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CrmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CrmError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Upstream lifetimes are clamped to `[0, MAX_TOKEN_LIFETIME_SECS]`.
fn expiry_from(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let lifetime = expires_in
        .unwrap_or(0)
        .saturating_sub(EXPIRY_SAFETY_BUFFER_SECS)
        .clamp(0, MAX_TOKEN_LIFETIME_SECS);
    Duration::try_seconds(lifetime)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(now)
}

fn text(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(raw) if !raw.is_empty() => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn nested_text(record: &Value, key: &str, field: &str) -> Option<String> {
    record.get(key).and_then(|inner| text(inner, field))
}

/// Lookup fields arrive either as `{ "name": .., "id": .. }` or as a string.
fn lookup_name(record: &Value, key: &str) -> Option<String> {
    nested_text(record, key, "name").or_else(|| text(record, key))
}

pub(crate) fn deal_from_record(record: &Value) -> Deal {
    let id = text(record, "id").unwrap_or_default();
    Deal {
        lead_id: text(record, "Lead_ID").unwrap_or_else(|| id.clone()),
        deal_name: text(record, "Deal_Name").unwrap_or_else(|| "Unnamed Deal".to_string()),
        contact_name: lookup_name(record, "Contact_Name")
            .unwrap_or_else(|| "Unknown Contact".to_string()),
        account_name: lookup_name(record, "Account_Name")
            .unwrap_or_else(|| "Unknown Account".to_string()),
        phone: text(record, "Phone")
            .or_else(|| nested_text(record, "Contact_Name", "phone"))
            .unwrap_or_default(),
        email: text(record, "Email")
            .or_else(|| nested_text(record, "Contact_Name", "email"))
            .unwrap_or_default(),
        address: text(record, "Billing_Street")
            .or_else(|| text(record, "Mailing_Street"))
            .unwrap_or_default(),
        stage: text(record, "Stage").unwrap_or_else(|| "Unknown".to_string()),
        amount: record.get("Amount").and_then(Value::as_f64).unwrap_or(0.0),
        id,
    }
}
