use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    domain::{errors::DomainError, transfer::Transfer},
    infrastructure::{
        TransferMutation, TransferRepository,
        atomic_file::{atomic_write, read_optional},
        in_memory_transfer_repository::{
            TransferTable, apply_mutation, insert_new, replace_existing,
        },
    },
};

pub const SNAPSHOT_FILE_NAME: &str = "transfers.json";

/// Transfer store that keeps the working set in memory and rewrites a JSON
/// snapshot after every successful write.
pub struct JsonFileTransferRepository {
    path: PathBuf,
    transfers: RwLock<TransferTable>,
}

impl JsonFileTransferRepository {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = data_dir.as_ref().join(SNAPSHOT_FILE_NAME);
        let bytes = read_optional(&path).await.map_err(|err| {
            DomainError::storage(format!("failed to read '{}': {err}", path.display()))
        })?;

        let table = match bytes {
            Some(bytes) => {
                let records: Vec<Transfer> = serde_json::from_slice(&bytes).map_err(|err| {
                    DomainError::storage(format!(
                        "transfer snapshot '{}' is corrupt: {err}",
                        path.display()
                    ))
                })?;
                records
                    .into_iter()
                    .map(|transfer| (transfer.id.clone(), transfer))
                    .collect()
            }
            None => TransferTable::new(),
        };

        info!(path = %path.display(), transfers = table.len(), "transfer snapshot loaded");

        Ok(Self {
            path,
            transfers: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &TransferTable) -> Result<(), DomainError> {
        let mut records: Vec<&Transfer> = table.values().collect();
        records.sort_by(|left, right| left.id.cmp(&right.id));

        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|err| DomainError::storage(format!("failed to encode transfers: {err}")))?;
        atomic_write(&self.path, &bytes).await.map_err(|err| {
            DomainError::storage(format!("failed to write transfer snapshot: {err}"))
        })?;

        debug!(path = %self.path.display(), transfers = records.len(), "transfer snapshot written");
        Ok(())
    }
}

#[async_trait]
impl TransferRepository for JsonFileTransferRepository {
    async fn create(&self, transfer: Transfer) -> Result<Transfer, DomainError> {
        let mut table = self.transfers.write().await;
        let created = insert_new(&mut table, transfer)?;
        if let Err(err) = self.persist(&table).await {
            table.remove(&created.id);
            return Err(err);
        }
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<Option<Transfer>, DomainError> {
        Ok(self.transfers.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transfer>, DomainError> {
        Ok(self.transfers.read().await.values().cloned().collect())
    }

    async fn update(&self, transfer: Transfer) -> Result<Option<Transfer>, DomainError> {
        let mut table = self.transfers.write().await;
        let previous = table.get(&transfer.id).cloned();
        let Some(updated) = replace_existing(&mut table, transfer) else {
            return Ok(None);
        };
        if let Err(err) = self.persist(&table).await {
            if let Some(previous) = previous {
                table.insert(previous.id.clone(), previous);
            }
            return Err(err);
        }
        Ok(Some(updated))
    }

    async fn mutate(
        &self,
        id: &str,
        mutation: TransferMutation,
    ) -> Result<Option<Transfer>, DomainError> {
        let mut table = self.transfers.write().await;
        let previous = table.get(id).cloned();
        let Some(mutated) = apply_mutation(&mut table, id, mutation)? else {
            return Ok(None);
        };
        if let Err(err) = self.persist(&table).await {
            if let Some(previous) = previous {
                table.insert(previous.id.clone(), previous);
            }
            return Err(err);
        }
        Ok(Some(mutated))
    }
}
