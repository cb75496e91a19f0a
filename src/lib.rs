pub mod app;
pub mod application;
pub mod auth;
pub mod config;
pub mod crm;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod state;

pub use app::{build_router, build_state};
