//! External CRM integration: OAuth tokens, token persistence, deal lookup.

pub mod client;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod token_store;

pub use client::{CrmClient, CrmConnection, CrmUserInfo};
pub use config::CrmConfig;
pub use error::CrmError;
pub use token_store::{CrmTokens, FileTokenStore, MemoryTokenStore, TokenStore};
