pub mod credentials;
pub mod session;

pub use credentials::{AdminDirectory, AdminRole, AdminUser};
pub use session::{SESSION_COOKIE, SessionSigner, cookie_value};
