use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    application::dto::{
        CrmCallbackQuery, CrmCallbackResponse, CrmRefreshResponse, CrmStatusResponse,
    },
    crm::{CrmClient, CrmError},
    domain::{deal::DealSearchResult, errors::DomainError},
};

/// How long a consent redirect may take before its `state` is forgotten.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

const DEFAULT_ORGANIZATION: &str = "CRM Organization";

pub struct CrmService {
    client: Arc<CrmClient>,
    pending_states: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl CrmService {
    pub fn new(client: Arc<CrmClient>) -> Self {
        Self {
            client,
            pending_states: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a fresh OAuth `state` and returns the consent URL carrying it.
    pub async fn begin_login(&self) -> Result<String, DomainError> {
        let state = Uuid::new_v4().simple().to_string();
        let url = self.client.authorization_url(&state)?;

        let now = Utc::now();
        let mut pending = self.pending_states.lock().await;
        pending.retain(|_, issued_at| !state_expired(*issued_at, now));
        pending.insert(state, now);

        debug!(pending_states = pending.len(), "crm consent redirect issued");
        Ok(url)
    }

    /// Finishes the consent flow. The `state` is consumed whether or not the
    /// code exchange succeeds.
    pub async fn complete_login(
        &self,
        query: CrmCallbackQuery,
    ) -> Result<CrmCallbackResponse, DomainError> {
        if let Some(error) = query.error {
            let description = query.error_description.unwrap_or_default();
            warn!(error = %error, description = %description, "crm consent was not granted");
            return Err(DomainError::validation(format!(
                "CRM authorization failed: {error}"
            )));
        }

        let code = query
            .code
            .filter(|code| !code.trim().is_empty())
            .ok_or_else(|| DomainError::validation("authorization code is missing"))?;
        let state = query
            .state
            .ok_or_else(|| DomainError::validation("OAuth state is missing"))?;
        self.consume_state(&state).await?;

        let connection = self.client.exchange_code(code.trim()).await.map_err(|err| {
            warn!(error = %err, "crm code exchange failed");
            DomainError::from(err)
        })?;

        Ok(CrmCallbackResponse::from(connection))
    }

    /// Current connection, refreshing an expired access token first when a
    /// refresh token is available. `None` means not connected.
    pub async fn status(&self) -> Result<Option<CrmStatusResponse>, DomainError> {
        let store = self.client.token_store();
        let mut tokens = store.get().await?;
        if tokens.access_token.is_empty() {
            return Ok(None);
        }

        if !tokens.is_valid_at(Utc::now()) {
            if !tokens.has_refresh_token() {
                return Ok(None);
            }
            tokens = match self.client.refresh().await {
                Ok(refreshed) => refreshed,
                Err(err) => {
                    warn!(error = %err, "crm token refresh during status check failed");
                    return Ok(None);
                }
            };
        }

        let user = match self.client.user_info(&tokens.access_token).await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "crm token validation failed");
                return Ok(None);
            }
        };

        let scope = if tokens.scope.is_empty() {
            self.client.config().scope.clone()
        } else {
            tokens.scope.clone()
        };

        Ok(Some(CrmStatusResponse {
            authenticated: true,
            organization: non_empty_or(user.display_name, DEFAULT_ORGANIZATION),
            user: non_empty_or(user.email, &tokens.user_email),
            api_domain: tokens.api_domain.clone(),
            expires_at: tokens.expires_at,
            expires_in: tokens.seconds_until_expiry_at(Utc::now()),
            scopes: scope
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }))
    }

    /// Manual token refresh. Every failure surfaces as a refresh error.
    pub async fn refresh(&self) -> Result<CrmRefreshResponse, DomainError> {
        let tokens = self.client.refresh().await.map_err(|err| {
            warn!(error = %err, "manual crm token refresh failed");
            match err {
                CrmError::MissingRefreshToken => {
                    DomainError::Refresh("no CRM refresh token available".to_string())
                }
                CrmError::TokenStore(_) => DomainError::from(err),
                _ => DomainError::Refresh("CRM token refresh failed".to_string()),
            }
        })?;

        Ok(CrmRefreshResponse {
            success: true,
            expires_in: tokens.seconds_until_expiry_at(Utc::now()),
            token_type: "Bearer",
        })
    }

    pub async fn logout(&self) -> Result<(), DomainError> {
        self.client.revoke().await?;
        info!("crm connection closed");
        Ok(())
    }

    pub async fn search_deals(&self, lead_id: &str) -> Result<DealSearchResult, DomainError> {
        self.client.search_deals(lead_id).await.map_err(|err| {
            debug!(error = %err, "crm deal search rejected");
            DomainError::from(err)
        })
    }

    async fn consume_state(&self, state: &str) -> Result<(), DomainError> {
        let now = Utc::now();
        let mut pending = self.pending_states.lock().await;
        match pending.remove(state) {
            Some(issued_at) if !state_expired(issued_at, now) => Ok(()),
            Some(_) => Err(DomainError::validation("OAuth state has expired")),
            None => Err(DomainError::validation("OAuth state is unknown")),
        }
    }
}

fn state_expired(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - issued_at > Duration::minutes(OAUTH_STATE_TTL_MINUTES)
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
