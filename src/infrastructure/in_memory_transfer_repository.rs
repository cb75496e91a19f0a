use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    domain::{errors::DomainError, transfer::Transfer},
    infrastructure::{TransferMutation, TransferRepository},
};

pub(crate) type TransferTable = HashMap<String, Transfer>;

#[derive(Default)]
pub struct InMemoryTransferRepository {
    transfers: RwLock<TransferTable>,
}

impl InMemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn insert_new(
    table: &mut TransferTable,
    transfer: Transfer,
) -> Result<Transfer, DomainError> {
    if table.contains_key(&transfer.id) {
        return Err(DomainError::internal(format!(
            "transfer id collision for {}",
            transfer.id
        )));
    }
    table.insert(transfer.id.clone(), transfer.clone());
    Ok(transfer)
}

pub(crate) fn replace_existing(table: &mut TransferTable, transfer: Transfer) -> Option<Transfer> {
    let slot = table.get_mut(&transfer.id)?;
    *slot = transfer.clone();
    Some(transfer)
}

pub(crate) fn apply_mutation(
    table: &mut TransferTable,
    id: &str,
    mutation: TransferMutation,
) -> Result<Option<Transfer>, DomainError> {
    let Some(current) = table.get(id) else {
        return Ok(None);
    };

    let mut draft = current.clone();
    mutation(&mut draft)?;
    draft.version += 1;

    table.insert(id.to_string(), draft.clone());
    Ok(Some(draft))
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn create(&self, transfer: Transfer) -> Result<Transfer, DomainError> {
        insert_new(&mut *self.transfers.write().await, transfer)
    }

    async fn get(&self, id: &str) -> Result<Option<Transfer>, DomainError> {
        Ok(self.transfers.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transfer>, DomainError> {
        Ok(self.transfers.read().await.values().cloned().collect())
    }

    async fn update(&self, transfer: Transfer) -> Result<Option<Transfer>, DomainError> {
        Ok(replace_existing(&mut *self.transfers.write().await, transfer))
    }

    async fn mutate(
        &self,
        id: &str,
        mutation: TransferMutation,
    ) -> Result<Option<Transfer>, DomainError> {
        apply_mutation(&mut *self.transfers.write().await, id, mutation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::{
        lifecycle,
        transfer::{NewTransfer, TransferStatus},
    };

    fn sample() -> Transfer {
        let now = Utc::now();
        NewTransfer {
            name: "Fatma Demir".to_string(),
            external_lead_id: "LEAD-002".to_string(),
            location: "Istiklal Caddesi No:456".to_string(),
            pickup_time: now + Duration::hours(2),
            drop_off_time: now + Duration::hours(3),
            deal_id: Some("deal_002".to_string()),
        }
        .build(now)
    }

    #[tokio::test]
    async fn create_get_and_list() {
        let repo = InMemoryTransferRepository::new();
        let created = repo.create(sample()).await.unwrap();

        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_replaces_only_known_records() {
        let repo = InMemoryTransferRepository::new();
        let mut created = repo.create(sample()).await.unwrap();
        created.location = "Galata".to_string();

        let updated = repo.update(created.clone()).await.unwrap().unwrap();
        assert_eq!(updated.location, "Galata");

        let mut stranger = sample();
        stranger.id = "TR-unknown".to_string();
        assert!(repo.update(stranger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_record_untouched() {
        let repo = InMemoryTransferRepository::new();
        let created = repo.create(sample()).await.unwrap();

        let err = repo
            .mutate(
                &created.id,
                Box::new(|transfer: &mut Transfer| {
                    lifecycle::advance(transfer, "dropped_off", "skip").map(|_| ())
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition { .. }));

        let stored = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn concurrent_advances_never_lose_an_update() {
        let repo = Arc::new(InMemoryTransferRepository::new());
        let created = repo.create(sample()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = Arc::clone(&repo);
            let id = created.id.clone();
            handles.push(tokio::spawn(async move {
                repo.mutate(
                    &id,
                    Box::new(|transfer: &mut Transfer| {
                        lifecycle::advance(transfer, "arrived", "here").map(|_| ())
                    }),
                )
                .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        let stored = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(successes, 1);
        assert_eq!(stored.status, TransferStatus::Arrived);
        assert_eq!(stored.history.len(), 1);
        assert_eq!(stored.version, created.version + 1);
    }
}
