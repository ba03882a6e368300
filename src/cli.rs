use clap::{Parser, Subcommand};
use chrono::Utc;
use uuid::Uuid;

use crate::config::{Config, RepositoryBackend};
use crate::domain::{Stage, Transaction};
use crate::ports::StageFilter;
use crate::services::TransactionService;
use crate::validation::{DecimalInput, TransactionDraft};

#[derive(Parser)]
#[command(name = "b100-tracker")]
#[command(about = "B100 Tracker - biodiesel sale fulfillment and payment workflow", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction management commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Print the completion report for finished cycles
    Report,

    /// List the workflow stages in order
    Stages,

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a new sale with every stage pending
    Create {
        #[arg(long)]
        buyer: String,
        /// Volume in liters
        #[arg(long)]
        volume: String,
        #[arg(long)]
        cost: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        feedstock: String,
        /// Sale date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },

    /// Show one transaction with its stages
    Show {
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },

    /// List transactions
    List {
        /// all, in-progress or completed
        #[arg(long, value_enum, default_value = "all")]
        status: StatusArg,
    },

    /// Mark a stage of a transaction as completed now
    Mark {
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
        /// Stage key, e.g. b100Dispatched
        #[arg(value_name = "STAGE")]
        stage: String,
    },

    /// Delete a transaction
    Delete {
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StatusArg {
    All,
    InProgress,
    Completed,
}

impl From<StatusArg> for StageFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StageFilter::All,
            StatusArg::InProgress => StageFilter::InProgress,
            StatusArg::Completed => StageFilter::Completed,
        }
    }
}

pub async fn handle_tx(service: &TransactionService, command: TxCommands) -> anyhow::Result<()> {
    match command {
        TxCommands::Create {
            buyer,
            volume,
            cost,
            city,
            feedstock,
            date,
        } => {
            let draft = TransactionDraft {
                buyer: Some(buyer),
                volume: Some(DecimalInput::Text(volume)),
                cost: Some(DecimalInput::Text(cost)),
                city: Some(city),
                feedstock: Some(feedstock),
                date: Some(date),
            };
            let tx = service.create(&draft).await?;
            println!("✓ Transaction {} created", tx.id);
            print_transaction(&tx);
        }
        TxCommands::Show { tx_id } => {
            let tx = service.get(tx_id).await?;
            print_transaction(&tx);
        }
        TxCommands::List { status } => {
            let transactions = service.list(status.into()).await?;
            if transactions.is_empty() {
                println!("No transactions found");
                return Ok(());
            }

            println!("{:<38} {:<20} {:<12} {:<8}", "ID", "Buyer", "Date", "Stages");
            println!("{}", "-".repeat(80));
            for tx in transactions {
                println!(
                    "{:<38} {:<20} {:<12} {}/{}",
                    tx.id,
                    tx.buyer,
                    tx.date,
                    tx.stages.completed_count(),
                    Stage::ALL.len()
                );
            }
        }
        TxCommands::Mark { tx_id, stage } => {
            let tx = service.mark_stage(tx_id, &stage, Utc::now()).await?;
            println!("✓ Stage {} marked as completed", stage);
            if tx.is_complete() {
                println!("✓ All stages completed, cycle finished");
            } else if let Some(next) = tx.next_stage() {
                println!("  Next pending stage: {} ({})", next, next.label());
            }
        }
        TxCommands::Delete { tx_id } => {
            service.delete(tx_id).await?;
            println!("✓ Transaction {} deleted", tx_id);
        }
    }

    Ok(())
}

pub async fn handle_report(service: &TransactionService) -> anyhow::Result<()> {
    let report = service.completion_report().await?;

    println!("Completed cycles: {}", report.transaction_count);
    println!("{:<30} {:>18} {:>20}", "Buyer", "Total Volume (KL)", "Total Cost (Crores)");
    println!("{}", "-".repeat(70));
    for row in &report.buyers {
        println!(
            "{:<30} {:>18} {:>20}",
            row.buyer, row.total_volume_kl, row.total_cost_crore
        );
    }
    println!("{}", "-".repeat(70));
    println!(
        "{:<30} {:>18} {:>20}",
        "Total", report.total_volume_kl, report.total_cost_crore
    );
    println!();
    println!("Tender capacity (L):  {}", report.capacity);
    println!("Remaining volume (L): {}", report.remaining_volume);
    match &report.completion_ratio {
        Some(ratio) => println!("Completion ratio:     {}", ratio),
        None => println!("Completion ratio:     n/a"),
    }

    Ok(())
}

pub fn handle_stages() {
    for (i, stage) in Stage::ALL.iter().enumerate() {
        println!("{}. {:<24} {}", i + 1, stage.as_str(), stage.label());
    }
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Repository Backend: {:?}", config.repository_backend);
    if config.repository_backend == RepositoryBackend::Postgres {
        println!("  Database URL: {}", mask_password(config.require_database_url()?));
        println!("  Max Connections: {}", config.database_max_connections);
    }
    println!("  Tender Capacity (L): {}", config.tender_capacity_liters);
    println!("  CORS Origins: {:?}", config.cors_allowed_origins);
    println!("  Log Format: {:?}", config.log_format);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn print_transaction(tx: &Transaction) {
    println!("  ID:        {}", tx.id);
    println!("  Buyer:     {}", tx.buyer);
    println!("  Volume:    {} L", tx.volume);
    println!("  Cost:      {}", tx.cost);
    println!("  City:      {}", tx.city);
    println!("  Feedstock: {}", tx.feedstock);
    println!("  Date:      {}", tx.date);
    println!("  Stages:");
    for (stage, status) in tx.stages.iter() {
        match status.completed_at() {
            Some(at) => println!("    [x] {:<24} {}", stage.as_str(), at.to_rfc3339()),
            None => println!("    [ ] {}", stage.as_str()),
        }
    }
}

/// Replaces the password in a connection URL, leaving everything else as is.
fn mask_password(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => match parsed.set_password(Some("****")) {
            Ok(()) => parsed.to_string(),
            Err(()) => raw.to_string(),
        },
        _ => raw.to_string(),
    }
}
