//! Transaction domain entity.
//! Framework-agnostic representation of a B100 sale and its stage record.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::stage::{Stage, StageRecord};

/// Validated input for a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub buyer: String,
    pub volume: BigDecimal,
    pub cost: BigDecimal,
    pub city: String,
    pub feedstock: String,
    pub date: NaiveDate,
}

/// Domain entity representing a B100 sale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub buyer: String,
    /// Liters.
    pub volume: BigDecimal,
    pub cost: BigDecimal,
    pub city: String,
    pub feedstock: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub stages: StageRecord,
}

impl Transaction {
    pub fn new(input: NewTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer: input.buyer,
            volume: input.volume,
            cost: input.cost,
            city: input.city,
            feedstock: input.feedstock,
            date: input.date,
            created_at: Utc::now(),
            stages: StageRecord::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        is_transaction_complete(self)
    }

    pub fn next_stage(&self) -> Option<Stage> {
        self.stages.next_incomplete()
    }
}

/// The one predicate that splits transactions into the in-progress and
/// completed views.
pub fn is_transaction_complete(tx: &Transaction) -> bool {
    tx.stages.is_complete()
}

/// Transaction plus the derived fields clients read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub complete: bool,
    pub next_stage: Option<Stage>,
}

impl From<Transaction> for TransactionView {
    fn from(transaction: Transaction) -> Self {
        Self {
            complete: transaction.is_complete(),
            next_stage: transaction.next_stage(),
            transaction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> NewTransaction {
        NewTransaction {
            buyer: "Acme".to_string(),
            volume: BigDecimal::from(1000),
            cost: BigDecimal::from(50000),
            city: "Pune".to_string(),
            feedstock: "UCO".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn new_transaction_starts_with_no_stages_done() {
        let tx = Transaction::new(acme());

        assert!(!tx.is_complete());
        assert_eq!(tx.stages, StageRecord::new());
        assert_eq!(tx.next_stage(), Some(Stage::B100Dispatched));
    }

    #[test]
    fn predicate_follows_the_stage_record() {
        let mut tx = Transaction::new(acme());
        for stage in Stage::ALL {
            assert!(!is_transaction_complete(&tx));
            tx.stages = tx.stages.mark_complete(stage, Utc::now()).unwrap();
        }
        assert!(is_transaction_complete(&tx));
    }

    #[test]
    fn view_serializes_flat_with_derived_fields() {
        let view = TransactionView::from(Transaction::new(acme()));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["buyer"], "Acme");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["complete"], false);
        assert_eq!(json["nextStage"], "b100Dispatched");
        assert!(json["createdAt"].is_string());
        assert_eq!(json["stages"].as_object().unwrap().len(), 7);
    }
}
