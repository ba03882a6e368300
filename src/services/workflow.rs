//! Use cases over the transaction repository: create, read, list the
//! in-progress and completed views, mark stages, delete, report.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::report::{build_report, CompletionReport};
use crate::domain::{Stage, Transaction};
use crate::error::AppError;
use crate::ports::{StageFilter, TransactionRepository};
use crate::validation::{validate_transaction, TransactionDraft};

#[derive(Clone)]
pub struct TransactionService {
    repo: Arc<dyn TransactionRepository>,
    capacity: BigDecimal,
}

impl TransactionService {
    /// `capacity` is the tender volume in liters that completion is measured
    /// against.
    pub fn new(repo: Arc<dyn TransactionRepository>, capacity: BigDecimal) -> Self {
        Self { repo, capacity }
    }

    pub fn repository(&self) -> Arc<dyn TransactionRepository> {
        Arc::clone(&self.repo)
    }

    pub fn capacity(&self) -> &BigDecimal {
        &self.capacity
    }

    pub async fn create(&self, draft: &TransactionDraft) -> Result<Transaction, AppError> {
        let input = validate_transaction(draft)?;
        let tx = self.repo.insert(&Transaction::new(input)).await?;

        tracing::info!(
            transaction_id = %tx.id,
            buyer = %tx.buyer,
            volume = %tx.volume,
            "Transaction created"
        );
        Ok(tx)
    }

    pub async fn get(&self, id: Uuid) -> Result<Transaction, AppError> {
        Ok(self.repo.get_by_id(id).await?)
    }

    /// Lists one view, ordered for display: in-progress and unfiltered by
    /// creation time, completed by sale date with the newest first.
    pub async fn list(&self, filter: StageFilter) -> Result<Vec<Transaction>, AppError> {
        let mut transactions = self.repo.list_where(filter).await?;
        sort_for_view(&mut transactions, filter);
        Ok(transactions)
    }

    /// Marks `stage_name` complete at `now`. Unknown names are rejected
    /// before the repository is touched; the repository rejects an already
    /// completed stage atomically, keeping its first timestamp.
    pub async fn mark_stage(
        &self,
        id: Uuid,
        stage_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction, AppError> {
        let stage: Stage = stage_name.parse()?;
        let updated = self.repo.update_stage(id, stage, now).await?;
        tracing::info!(
            transaction_id = %id,
            stage = %stage,
            completed_stages = updated.stages.completed_count(),
            "Stage marked complete"
        );
        if updated.is_complete() {
            tracing::info!(transaction_id = %id, buyer = %updated.buyer, "Transaction cycle completed");
        }

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.repo.delete(id).await?;
        tracing::info!(transaction_id = %id, "Transaction deleted");
        Ok(())
    }

    pub async fn completion_report(&self) -> Result<CompletionReport, AppError> {
        let completed = self.repo.list_where(StageFilter::Completed).await?;
        Ok(build_report(&completed, &self.capacity))
    }
}

pub fn sort_for_view(transactions: &mut [Transaction], filter: StageFilter) {
    match filter {
        StageFilter::Completed => transactions.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        StageFilter::All | StageFilter::InProgress => transactions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
    }
}
