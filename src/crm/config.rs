use std::time::Duration;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";
pub const DEFAULT_API_DOMAIN: &str = "www.zohoapis.com";
pub const DEFAULT_SCOPE: &str =
    "ZohoCRM.modules.deals.READ,ZohoCRM.modules.contacts.READ,ZohoCRM.modules.accounts.READ";

/// Seconds shaved off every token lifetime so a token is refreshed before the
/// CRM starts rejecting it.
pub const EXPIRY_SAFETY_BUFFER_SECS: i64 = 60;

/// Upper bound on an access token lifetime reported by the CRM.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// CRM OAuth client configuration
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// OAuth client id issued by the CRM
    pub client_id: String,

    /// OAuth client secret issued by the CRM
    pub client_secret: String,

    /// Where the CRM sends the browser back after consent
    pub redirect_uri: String,

    /// Base URL of the CRM accounts (OAuth) server
    pub accounts_url: String,

    /// Fixed API base URL; when unset it is derived from the stored API domain
    pub api_base_url: Option<String>,

    /// Comma separated OAuth scopes
    pub scope: String,

    /// Timeout applied to every CRM request
    pub request_timeout: Duration,
}

impl CrmConfig {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_base_url: None,
            scope: DEFAULT_SCOPE.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set the accounts server base URL
    pub fn accounts_url(mut self, url: &str) -> Self {
        self.accounts_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Pin the API base URL instead of deriving it from the user's region
    pub fn api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Set the requested OAuth scopes
    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub(crate) fn accounts_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.accounts_url, path)
    }

    /// API base for a token set whose region resolved to `api_domain`.
    pub(crate) fn api_base_for(&self, api_domain: &str) -> String {
        if let Some(base) = &self.api_base_url {
            return base.clone();
        }
        let domain = if api_domain.is_empty() {
            DEFAULT_API_DOMAIN
        } else {
            api_domain
        };
        format!("https://{domain}")
    }
}

/// API domain serving a CRM account registered in `country`.
pub fn api_domain_for_country(country: &str) -> &'static str {
    match country {
        "AU" => "www.zohoapis.com.au",
        "EU" => "www.zohoapis.eu",
        "IN" => "www.zohoapis.in",
        "CN" => "www.zohoapis.com.cn",
        _ => DEFAULT_API_DOMAIN,
    }
}
