use std::net::SocketAddr;

use b100_tracker::cli::{self, Cli, Commands, DbCommands};
use b100_tracker::config::{Config, LogFormat};
use b100_tracker::services::TransactionService;
use b100_tracker::{build_repository, cors_layer, create_app, AppState};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // for .with() on registry

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    // The stage list is static; it needs neither config nor storage.
    if let Commands::Stages = command {
        cli::handle_stages();
        return Ok(());
    }

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match command {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Stages => Ok(()),
        Commands::Report => cli::handle_report(&service(&config).await?).await,
        Commands::Tx(command) => cli::handle_tx(&service(&config).await?, command).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn service(config: &Config) -> anyhow::Result<TransactionService> {
    let repo = build_repository(config).await?;
    Ok(TransactionService::new(
        repo,
        config.tender_capacity_liters.clone(),
    ))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let service = service(&config).await?;
    tracing::info!(
        backend = ?config.repository_backend,
        capacity_liters = %config.tender_capacity_liters,
        "Transaction store ready"
    );

    let app = create_app(AppState::new(service)).layer(cors_layer(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
