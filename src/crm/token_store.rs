//! Persistence for the CRM OAuth tokens.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::crm::error::CrmError;
use crate::infrastructure::atomic_file::{atomic_write, read_optional};

/// Tokens and account facts captured when the CRM connection was made.
///
/// An empty string means "not set", matching how the CRM itself omits fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrmTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub organization_id: String,
    pub user_email: String,
    pub api_domain: String,
    pub scope: String,
}

impl CrmTokens {
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expires_at.is_some_and(|expires_at| expires_at > now)
    }

    pub fn seconds_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at
            .map(|expires_at| (expires_at - now).num_seconds().max(0))
            .unwrap_or(0)
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<CrmTokens, CrmError>;
    async fn set(&self, tokens: CrmTokens) -> Result<(), CrmError>;
    async fn clear(&self) -> Result<(), CrmError>;

    async fn is_valid(&self) -> Result<bool, CrmError> {
        Ok(self.get().await?.is_valid_at(Utc::now()))
    }

    async fn time_until_expiry(&self) -> Result<i64, CrmError> {
        Ok(self.get().await?.seconds_until_expiry_at(Utc::now()))
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<CrmTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: CrmTokens) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<CrmTokens, CrmError> {
        Ok(self.tokens.read().await.clone())
    }

    async fn set(&self, tokens: CrmTokens) -> Result<(), CrmError> {
        log_update(&tokens);
        *self.tokens.write().await = tokens;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CrmError> {
        *self.tokens.write().await = CrmTokens::default();
        info!("crm tokens cleared");
        Ok(())
    }
}

/// Token store backed by a JSON file; a missing file reads as empty tokens.
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<CrmTokens>>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<CrmTokens, CrmError> {
        let Some(bytes) = read_optional(&self.path)
            .await
            .map_err(|err| CrmError::TokenStore(err.to_string()))?
        else {
            return Ok(CrmTokens::default());
        };

        serde_json::from_slice(&bytes).map_err(|err| {
            CrmError::TokenStore(format!(
                "token file '{}' is corrupt: {err}",
                self.path.display()
            ))
        })
    }

    async fn write(&self, tokens: &CrmTokens) -> Result<(), CrmError> {
        let bytes = serde_json::to_vec_pretty(tokens)
            .map_err(|err| CrmError::TokenStore(err.to_string()))?;
        atomic_write(&self.path, &bytes)
            .await
            .map_err(|err| CrmError::TokenStore(err.to_string()))?;
        debug!(path = %self.path.display(), "crm token file written");
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<CrmTokens, CrmError> {
        if let Some(tokens) = self.cached.read().await.as_ref() {
            return Ok(tokens.clone());
        }

        let mut cached = self.cached.write().await;
        if let Some(tokens) = cached.as_ref() {
            return Ok(tokens.clone());
        }
        let tokens = self.load().await?;
        *cached = Some(tokens.clone());
        Ok(tokens)
    }

    async fn set(&self, tokens: CrmTokens) -> Result<(), CrmError> {
        let mut cached = self.cached.write().await;
        self.write(&tokens).await?;
        log_update(&tokens);
        *cached = Some(tokens);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CrmError> {
        let mut cached = self.cached.write().await;
        let empty = CrmTokens::default();
        self.write(&empty).await?;
        *cached = Some(empty);
        info!(path = %self.path.display(), "crm tokens cleared");
        Ok(())
    }
}

fn log_update(tokens: &CrmTokens) {
    info!(
        has_access_token = !tokens.access_token.is_empty(),
        has_refresh_token = tokens.has_refresh_token(),
        expires_at = ?tokens.expires_at,
        user_email = %tokens.user_email,
        "crm tokens updated"
    );
}
