use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    application::dto::{
        AdvanceStatusRequest, CreateTransferRequest, ListTransfersQueryRequest,
        ProblemReportRequest, ProblemReportResponse, TransferResponse, UndoStatusRequest,
    },
    domain::{errors::DomainError, lifecycle, transfer::Transfer},
    infrastructure::TransferRepository,
};

pub const PROBLEM_RECEIVED_MESSAGE: &str = "Problem report received";

#[derive(Clone)]
pub struct TransferService {
    repository: Arc<dyn TransferRepository>,
    public_base_url: String,
}

impl TransferService {
    pub fn new(repository: Arc<dyn TransferRepository>, public_base_url: impl Into<String>) -> Self {
        Self {
            repository,
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn create_transfer(
        &self,
        request: CreateTransferRequest,
    ) -> Result<TransferResponse, DomainError> {
        let new_transfer = request.into_domain()?;
        let created = self.repository.create(new_transfer.build(Utc::now())).await?;

        info!(
            transfer_id = %created.id,
            lead_id = %created.external_lead_id,
            pickup_time = %created.pickup_time,
            "transfer created"
        );
        Ok(self.respond(created))
    }

    /// All transfers, earliest pickup first, optionally narrowed to one status.
    pub async fn list_transfers(
        &self,
        query: ListTransfersQueryRequest,
    ) -> Result<Vec<TransferResponse>, DomainError> {
        let filter = query.into_domain()?;

        let mut transfers = self.repository.list().await?;
        if let Some(status) = filter.status {
            transfers.retain(|transfer| transfer.status == status);
        }
        transfers.sort_by(|left, right| {
            left.pickup_time
                .cmp(&right.pickup_time)
                .then_with(|| left.id.cmp(&right.id))
        });

        Ok(transfers
            .into_iter()
            .map(|transfer| self.respond(transfer))
            .collect())
    }

    pub async fn get_transfer(&self, id: &str) -> Result<TransferResponse, DomainError> {
        let transfer = self.load(id).await?;
        Ok(self.respond(transfer))
    }

    pub async fn advance_status(
        &self,
        id: &str,
        request: AdvanceStatusRequest,
    ) -> Result<TransferResponse, DomainError> {
        let AdvanceStatusRequest { status, note } = request;
        let Some(updated) = self
            .repository
            .mutate(
                id,
                Box::new(move |transfer: &mut Transfer| {
                    lifecycle::advance(transfer, &status, &note)?;
                    Ok(())
                }),
            )
            .await?
        else {
            return Err(transfer_not_found(id));
        };

        info!(
            transfer_id = %updated.id,
            status = %updated.status,
            version = updated.version,
            "transfer status advanced"
        );
        Ok(self.respond(updated))
    }

    pub async fn undo_status(
        &self,
        id: &str,
        request: UndoStatusRequest,
    ) -> Result<TransferResponse, DomainError> {
        let UndoStatusRequest {
            target_status,
            note,
        } = request;
        let Some(updated) = self
            .repository
            .mutate(
                id,
                Box::new(move |transfer: &mut Transfer| {
                    lifecycle::undo(transfer, &target_status, note.as_deref())?;
                    Ok(())
                }),
            )
            .await?
        else {
            return Err(transfer_not_found(id));
        };

        info!(
            transfer_id = %updated.id,
            status = %updated.status,
            version = updated.version,
            "transfer status reverted"
        );
        Ok(self.respond(updated))
    }

    /// Records a driver's problem report. Reports are logged, not stored.
    pub async fn report_problem(
        &self,
        id: &str,
        request: ProblemReportRequest,
    ) -> Result<ProblemReportResponse, DomainError> {
        let note = request.note.trim();
        if note.is_empty() {
            return Err(DomainError::validation("a problem description is required"));
        }

        let transfer = self.load(id).await?;
        let reported_at = Utc::now();
        let ticket_id = format!("PROB-{}", reported_at.timestamp_millis());

        warn!(
            transfer_id = %transfer.id,
            ticket_id = %ticket_id,
            stored_status = %transfer.status,
            reported_status = request.current_status.as_deref().unwrap_or("unknown"),
            note = %note,
            reported_at = %reported_at,
            "driver reported a problem"
        );

        Ok(ProblemReportResponse {
            success: true,
            message: PROBLEM_RECEIVED_MESSAGE,
            ticket_id,
        })
    }

    async fn load(&self, id: &str) -> Result<Transfer, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| transfer_not_found(id))
    }

    fn respond(&self, transfer: Transfer) -> TransferResponse {
        TransferResponse::new(transfer, &self.public_base_url)
    }
}

fn transfer_not_found(id: &str) -> DomainError {
    DomainError::not_found(format!("transfer '{id}' not found"))
}
