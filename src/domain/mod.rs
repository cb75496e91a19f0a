pub mod deal;
pub mod errors;
pub mod lifecycle;
pub mod transfer;
