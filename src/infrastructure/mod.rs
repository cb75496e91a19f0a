use async_trait::async_trait;

use crate::domain::{errors::DomainError, transfer::Transfer};

pub mod atomic_file;
pub mod demo_seed;
pub mod in_memory_transfer_repository;
pub mod json_file_transfer_repository;

/// Read-modify-write step applied by [`TransferRepository::mutate`].
pub type TransferMutation = Box<dyn FnOnce(&mut Transfer) -> Result<(), DomainError> + Send>;

#[async_trait]
pub trait TransferRepository: Send + Sync {
    async fn create(&self, transfer: Transfer) -> Result<Transfer, DomainError>;
    async fn get(&self, id: &str) -> Result<Option<Transfer>, DomainError>;
    async fn list(&self) -> Result<Vec<Transfer>, DomainError>;

    /// Replaces the stored record with the same id. Last writer wins.
    async fn update(&self, transfer: Transfer) -> Result<Option<Transfer>, DomainError>;

    /// Applies `mutation` to the stored record while holding the store's write
    /// lock. On success the record's version is bumped and the new value is
    /// stored and returned; on error nothing is written.
    async fn mutate(
        &self,
        id: &str,
        mutation: TransferMutation,
    ) -> Result<Option<Transfer>, DomainError>;
}
