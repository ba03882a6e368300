pub mod report;
pub mod stage;
pub mod transaction;

pub use stage::{mark_stage_complete, Stage, StageError, StageRecord, StageStatus};
pub use transaction::{is_transaction_complete, NewTransaction, Transaction, TransactionView};
