pub mod crm_service;
pub mod dto;
pub mod transfer_service;
