//! Signed admin session tokens and the cookie that carries them.
//!
//! A token is `base64url(claims json) "." base64url(hmac-sha256(first part))`.
//! Anything that fails to decode, fails the signature check, or has expired
//! verifies to `None`.

use axum::http::{HeaderMap, header};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::auth::credentials::{AdminRole, AdminUser};
use crate::domain::errors::DomainError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "admin_session";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionClaims {
    username: String,
    role: AdminRole,
    display_name: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
    ttl: Duration,
    secure_cookies: bool,
}

impl SessionSigner {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            secure_cookies: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn issue(&self, user: &AdminUser) -> Result<String, DomainError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &AdminUser, now: DateTime<Utc>) -> Result<String, DomainError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| DomainError::internal("session expiry out of range"))?;
        let claims = SessionClaims {
            username: user.username.clone(),
            role: user.role,
            display_name: user.display_name.clone(),
            issued_at: now,
            expires_at,
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|err| DomainError::internal(format!("failed to encode session: {err}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> Option<AdminUser> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<AdminUser> {
        let (payload, signature) = token.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: SessionClaims = serde_json::from_slice(&json).ok()?;
        if claims.expires_at <= now {
            return None;
        }

        Some(AdminUser {
            username: claims.username,
            role: claims.role,
            display_name: claims.display_name,
        })
    }

    /// `Set-Cookie` value installing `token`.
    pub fn cookie_for(&self, token: &str) -> String {
        self.cookie(token, self.ttl.num_seconds())
    }

    /// `Set-Cookie` value that deletes the session cookie.
    pub fn expired_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let secure = if self.secure_cookies { "; Secure" } else { "" };
        format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure}")
    }

    fn mac(&self) -> Result<HmacSha256, DomainError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| DomainError::internal(format!("invalid session secret: {err}")))
    }
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
