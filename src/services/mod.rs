pub mod workflow;

pub use workflow::TransactionService;
