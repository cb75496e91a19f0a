pub mod auth_handler;
pub mod crm_handler;
pub mod problem;
pub mod session_guard;
pub mod transfers_handler;
