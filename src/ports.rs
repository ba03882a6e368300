//! Storage port consumed by the workflow service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{is_transaction_complete, Stage, Transaction};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transaction {0} not found")]
    NotFound(Uuid),

    #[error("stage '{0}' is already completed")]
    StageAlreadyCompleted(Stage),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Which side of the completion predicate to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageFilter {
    #[default]
    All,
    InProgress,
    Completed,
}

impl StageFilter {
    pub fn matches(self, tx: &Transaction) -> bool {
        match self {
            StageFilter::All => true,
            StageFilter::InProgress => !is_transaction_complete(tx),
            StageFilter::Completed => is_transaction_complete(tx),
        }
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction>;

    /// Every stored transaction, in no particular order.
    async fn list_all(&self) -> RepositoryResult<Vec<Transaction>>;

    async fn list_where(&self, filter: StageFilter) -> RepositoryResult<Vec<Transaction>>;

    /// Sets one pending stage's completion timestamp and returns the updated
    /// record. The pending check and the write are one atomic step; a stage
    /// that is already completed yields `StageAlreadyCompleted` and keeps its
    /// timestamp.
    async fn update_stage(
        &self,
        id: Uuid,
        stage: Stage,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<Transaction>;

    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    async fn ping(&self) -> RepositoryResult<()>;
}
