use std::sync::Arc;

use crate::{
    application::{crm_service::CrmService, transfer_service::TransferService},
    auth::{AdminDirectory, SessionSigner},
};

#[derive(Clone)]
pub struct AppState {
    pub transfer_service: Arc<TransferService>,
    pub crm_service: Arc<CrmService>,
    pub admins: Arc<AdminDirectory>,
    pub sessions: Arc<SessionSigner>,
}

impl AppState {
    pub fn new(
        transfer_service: Arc<TransferService>,
        crm_service: Arc<CrmService>,
        admins: Arc<AdminDirectory>,
        sessions: Arc<SessionSigner>,
    ) -> Self {
        Self {
            transfer_service,
            crm_service,
            admins,
            sessions,
        }
    }
}
