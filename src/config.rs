use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};

use crate::crm::{
    CrmConfig,
    config::{DEFAULT_ACCOUNTS_URL, DEFAULT_SCOPE},
};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123!";
pub const DEFAULT_ROOT_PASSWORD: &str = "root123!";
/// Thirty days.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 30;
pub const DEFAULT_SESSION_SECRET: &str = "transfer-desk-dev-session-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

impl StoreBackend {
    fn parse(key: &str, raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => bail!("{key} must be 'memory' or 'file', got '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub public_base_url: String,
    pub transfer_store: StoreBackend,
    pub data_dir: PathBuf,
    pub seed_demo: bool,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub admin_password: String,
    pub root_password: String,
    pub password_hash_cost: u32,
    pub crm: CrmConfig,
    pub token_store: StoreBackend,
    pub token_file: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset and blank keys
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let env_string = |key: &str, default: &str| env(key).unwrap_or_else(|| default.to_string());

        let bind_addr = env_string("TD_BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .context("TD_BIND_ADDR must be a valid host:port")?;

        let public_base_url = env("TD_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{bind_addr}"))
            .trim_end_matches('/')
            .to_string();

        let transfer_store = StoreBackend::parse(
            "TD_TRANSFER_STORE",
            &env_string("TD_TRANSFER_STORE", "memory"),
        )?;
        let data_dir = PathBuf::from(env_string("TD_DATA_DIR", ".data"));
        let seed_demo = parse_bool("TD_SEED_DEMO", env("TD_SEED_DEMO"), false)?;

        let session_secret = env_string("TD_SESSION_SECRET", DEFAULT_SESSION_SECRET);
        let session_ttl_hours = env_string("TD_SESSION_TTL_HOURS", "24")
            .parse::<i64>()
            .context("TD_SESSION_TTL_HOURS must be a whole number of hours")?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            bail!("TD_SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}");
        }
        let secure_cookies = parse_bool("TD_SECURE_COOKIES", env("TD_SECURE_COOKIES"), false)?;

        let admin_password = env_string("TD_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD);
        let root_password = env_string("TD_ROOT_PASSWORD", DEFAULT_ROOT_PASSWORD);
        let password_hash_cost = env_string("TD_PASSWORD_HASH_COST", &bcrypt::DEFAULT_COST.to_string())
            .parse::<u32>()
            .context("TD_PASSWORD_HASH_COST must be a number")?;
        if !(4..=31).contains(&password_hash_cost) {
            bail!("TD_PASSWORD_HASH_COST must be between 4 and 31");
        }

        let redirect_uri = env("CRM_REDIRECT_URI")
            .unwrap_or_else(|| format!("{public_base_url}/crm/auth/callback"));
        let timeout_secs = env_string("CRM_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .context("CRM_TIMEOUT_SECS must be a number of seconds")?;

        let mut crm = CrmConfig::new(
            &env("CRM_CLIENT_ID").unwrap_or_default(),
            &env("CRM_CLIENT_SECRET").unwrap_or_default(),
            &redirect_uri,
        )
        .accounts_url(&env_string("CRM_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL))
        .scope(&env_string("CRM_SCOPE", DEFAULT_SCOPE))
        .request_timeout(Duration::from_secs(timeout_secs));
        if let Some(api_base_url) = env("CRM_API_BASE_URL") {
            crm = crm.api_base_url(&api_base_url);
        }

        let token_store =
            StoreBackend::parse("CRM_TOKEN_STORE", &env_string("CRM_TOKEN_STORE", "memory"))?;
        let token_file = env("CRM_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("crm_tokens.json"));

        Ok(Self {
            bind_addr,
            public_base_url,
            transfer_store,
            data_dir,
            seed_demo,
            session_secret,
            session_ttl_hours,
            secure_cookies,
            admin_password,
            root_password,
            password_hash_cost,
            crm,
            token_store,
            token_file,
        })
    }

    /// Settings that still carry their development defaults.
    pub fn insecure_defaults(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.session_secret == DEFAULT_SESSION_SECRET {
            warnings.push("TD_SESSION_SECRET");
        }
        if self.admin_password == DEFAULT_ADMIN_PASSWORD {
            warnings.push("TD_ADMIN_PASSWORD");
        }
        if self.root_password == DEFAULT_ROOT_PASSWORD {
            warnings.push("TD_ROOT_PASSWORD");
        }
        warnings
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean, got '{other}'"),
    }
}
