//! Postgres implementation of TransactionRepository.
//!
//! Each stage is a nullable `*_at` column; a stage is completed when its
//! column is non-null. The completion predicate is compiled from
//! [`Stage::ALL`] so SQL and Rust agree on what "complete" means.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Stage, StageRecord, Transaction};
use crate::ports::{RepositoryError, RepositoryResult, StageFilter, TransactionRepository};

const COLUMNS: &str = "id, buyer, volume, cost, city, feedstock, tx_date, created_at, \
    b100_dispatched_at, b100_supplied_at, receiving_copy_received_at, \
    rc_uploaded_to_buyer_at, rc_uploaded_to_bank_at, amount_received_from_bank_at, \
    bank_received_from_buyer_at";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `a IS NOT NULL AND b IS NOT NULL AND ...` over every stage column.
pub fn completed_predicate() -> String {
    Stage::ALL
        .iter()
        .map(|stage| format!("{} IS NOT NULL", stage.column()))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn filter_clause(filter: StageFilter) -> String {
    match filter {
        StageFilter::All => String::new(),
        StageFilter::Completed => format!(" WHERE {}", completed_predicate()),
        StageFilter::InProgress => format!(" WHERE NOT ({})", completed_predicate()),
    }
}

/// Sets the stage column only while it is still NULL, so a completed stage
/// keeps its first timestamp even under concurrent marks.
fn update_stage_sql(stage: Stage) -> String {
    format!(
        "UPDATE transactions SET {col} = $2 WHERE id = $1 AND {col} IS NULL RETURNING {COLUMNS}",
        col = stage.column()
    )
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let sql = format!(
            r#"
            INSERT INTO transactions ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {COLUMNS}
            "#
        );
        let mut query = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(tx.id)
            .bind(&tx.buyer)
            .bind(&tx.volume)
            .bind(&tx.cost)
            .bind(&tx.city)
            .bind(&tx.feedstock)
            .bind(tx.date)
            .bind(tx.created_at);
        for completed_at in tx.stages.timestamps() {
            query = query.bind(completed_at);
        }

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(row.into_domain())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        let sql = format!("SELECT {COLUMNS} FROM transactions WHERE id = $1");
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(|r| r.into_domain())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Transaction>> {
        self.list_where(StageFilter::All).await
    }

    async fn list_where(&self, filter: StageFilter) -> RepositoryResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM transactions{}",
            filter_clause(filter)
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn update_stage(
        &self,
        id: Uuid,
        stage: Stage,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<Transaction> {
        let sql = update_stage_sql(stage);
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .bind(completed_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => Ok(row.into_domain()),
            // No row updated: either the id is unknown or the stage was
            // already set. get_by_id reports NotFound for the former.
            None => {
                self.get_by_id(id).await?;
                Err(RepositoryError::StageAlreadyCompleted(stage))
            }
        }
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    buyer: String,
    volume: BigDecimal,
    cost: BigDecimal,
    city: String,
    feedstock: String,
    tx_date: NaiveDate,
    created_at: DateTime<Utc>,
    b100_dispatched_at: Option<DateTime<Utc>>,
    b100_supplied_at: Option<DateTime<Utc>>,
    receiving_copy_received_at: Option<DateTime<Utc>>,
    rc_uploaded_to_buyer_at: Option<DateTime<Utc>>,
    rc_uploaded_to_bank_at: Option<DateTime<Utc>>,
    amount_received_from_bank_at: Option<DateTime<Utc>>,
    bank_received_from_buyer_at: Option<DateTime<Utc>>,
}

impl TransactionRow {
    fn into_domain(self) -> Transaction {
        // Same order as Stage::ALL.
        let stages = StageRecord::from_timestamps([
            self.b100_dispatched_at,
            self.b100_supplied_at,
            self.receiving_copy_received_at,
            self.rc_uploaded_to_buyer_at,
            self.rc_uploaded_to_bank_at,
            self.amount_received_from_bank_at,
            self.bank_received_from_buyer_at,
        ]);

        Transaction {
            id: self.id,
            buyer: self.buyer,
            volume: self.volume,
            cost: self.cost,
            city: self.city,
            feedstock: self.feedstock,
            date: self.tx_date,
            created_at: self.created_at,
            stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_predicate_covers_every_stage() {
        let predicate = completed_predicate();

        for stage in Stage::ALL {
            assert!(predicate.contains(&format!("{} IS NOT NULL", stage.column())));
            assert!(COLUMNS.contains(stage.column()));
        }
        assert_eq!(predicate.matches(" AND ").count(), Stage::ALL.len() - 1);
    }

    #[test]
    fn stage_update_only_touches_pending_column() {
        let sql = update_stage_sql(Stage::RcUploadedToBank);

        assert!(sql.starts_with("UPDATE transactions SET rc_uploaded_to_bank_at = $2"));
        assert!(sql.contains("WHERE id = $1 AND rc_uploaded_to_bank_at IS NULL"));
    }

    #[test]
    fn filter_clauses() {
        assert_eq!(filter_clause(StageFilter::All), "");
        assert!(filter_clause(StageFilter::Completed).starts_with(" WHERE b100_dispatched_at"));
        assert!(filter_clause(StageFilter::InProgress).starts_with(" WHERE NOT ("));
    }
}
