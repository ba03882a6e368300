//! In-memory implementation of TransactionRepository.
//!
//! Backs tests and `REPOSITORY_BACKEND=memory` runs. Nothing survives a
//! restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Stage, Transaction};
use crate::ports::{RepositoryError, RepositoryResult, StageFilter, TransactionRepository};

#[derive(Default)]
pub struct MemoryTransactionRepository {
    transactions: RwLock<HashMap<Uuid, Transaction>>,
    unavailable: RwLock<bool>,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `Unavailable` until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    async fn check_available(&self) -> RepositoryResult<()> {
        if *self.unavailable.read().await {
            return Err(RepositoryError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        self.check_available().await?;
        self.transactions.write().await.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        self.check_available().await?;
        self.transactions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Transaction>> {
        self.list_where(StageFilter::All).await
    }

    async fn list_where(&self, filter: StageFilter) -> RepositoryResult<Vec<Transaction>> {
        self.check_available().await?;
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    async fn update_stage(
        &self,
        id: Uuid,
        stage: Stage,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<Transaction> {
        self.check_available().await?;
        let mut store = self.transactions.write().await;
        let tx = store.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;

        // Checked and written under the same write lock.
        tx.stages = tx
            .stages
            .mark_complete(stage, completed_at)
            .map_err(|_| RepositoryError::StageAlreadyCompleted(stage))?;

        Ok(tx.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.check_available().await?;
        self.transactions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.check_available().await
    }
}
