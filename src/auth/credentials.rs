use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Admin role level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Day-to-day dispatch staff
    Admin,
    /// Operators who also manage the CRM connection
    Root,
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Root => f.write_str("root"),
        }
    }
}

/// Authenticated admin identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub username: String,
    pub role: AdminRole,
    pub display_name: String,
}

struct AdminAccount {
    user: AdminUser,
    password_hash: String,
}

/// Admin account directory
///
/// Holds the fixed set of dashboard accounts with bcrypt password hashes.
pub struct AdminDirectory {
    accounts: HashMap<String, AdminAccount>,
    hash_cost: u32,
}

impl AdminDirectory {
    pub const DEFAULT_ADMIN_USERNAME: &'static str = "admin";
    pub const DEFAULT_ROOT_USERNAME: &'static str = "root";

    /// Creates an empty directory hashing with the given bcrypt cost
    pub fn empty(hash_cost: u32) -> Self {
        Self {
            accounts: HashMap::new(),
            hash_cost,
        }
    }

    /// Creates the standard `admin` and `root` accounts
    pub fn with_default_accounts(
        admin_password: &str,
        root_password: &str,
        hash_cost: u32,
    ) -> Result<Self, DomainError> {
        Self::empty(hash_cost)
            .with_account(
                AdminUser {
                    username: Self::DEFAULT_ADMIN_USERNAME.to_string(),
                    role: AdminRole::Admin,
                    display_name: "Admin User".to_string(),
                },
                admin_password,
            )?
            .with_account(
                AdminUser {
                    username: Self::DEFAULT_ROOT_USERNAME.to_string(),
                    role: AdminRole::Root,
                    display_name: "Root User".to_string(),
                },
                root_password,
            )
    }

    /// Adds an account, replacing any account with the same username
    pub fn with_account(mut self, user: AdminUser, password: &str) -> Result<Self, DomainError> {
        if password.is_empty() {
            return Err(DomainError::validation(format!(
                "password for '{}' must not be empty",
                user.username
            )));
        }

        let password_hash = self.hash_password(password)?;
        self.accounts.insert(
            user.username.clone(),
            AdminAccount {
                user,
                password_hash,
            },
        );
        Ok(self)
    }

    /// Hashes a password using bcrypt
    ///
    /// Each hash includes a random salt, so the same password will produce different hashes.
    fn hash_password(&self, password: &str) -> Result<String, DomainError> {
        bcrypt::hash(password, self.hash_cost)
            .map_err(|err| DomainError::internal(format!("failed to hash password: {err}")))
    }

    /// Verifies password against bcrypt hash
    fn verify_password(password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }

    /// Returns the account matching the credentials, if any
    pub fn authenticate(&self, username: &str, password: &str) -> Option<AdminUser> {
        let account = self.accounts.get(username)?;
        Self::verify_password(password, &account.password_hash).then(|| account.user.clone())
    }

    /// Lists usernames in sorted order
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.accounts.keys().cloned().collect();
        names.sort();
        names
    }
}
