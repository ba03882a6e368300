pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod utils;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::{AllowedOrigins, Config, RepositoryBackend};
use crate::health::RepositoryChecker;
use crate::ports::TransactionRepository;
use crate::services::TransactionService;

#[derive(Clone)]
pub struct AppState {
    pub service: TransactionService,
    pub health: Arc<RepositoryChecker>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: TransactionService) -> Self {
        let health = Arc::new(RepositoryChecker::new(service.repository()));
        Self {
            service,
            health,
            start_time: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/transactions/:id",
            get(handlers::transactions::get_transaction)
                .put(handlers::transactions::mark_stage)
                .delete(handlers::transactions::delete_transaction),
        )
        .route(
            "/api/completed-transactions",
            get(handlers::transactions::list_completed_transactions),
        )
        .route(
            "/api/reports/completion",
            get(handlers::reports::completion_report),
        )
        .route("/api/stages", get(handlers::reports::list_stages))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}

pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    match origins {
        AllowedOrigins::Any => layer.allow_origin(Any),
        AllowedOrigins::List(list) => layer.allow_origin(
            list.iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>(),
        ),
    }
}

/// Opens the configured store. Postgres pools run pending migrations first.
pub async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn TransactionRepository>> {
    match config.repository_backend {
        RepositoryBackend::Memory => {
            tracing::warn!("Using in-memory transaction store; data is lost on restart");
            Ok(Arc::new(adapters::MemoryTransactionRepository::new()))
        }
        RepositoryBackend::Postgres => {
            let pool = db::create_pool(config).await?;
            db::run_migrations(&pool).await?;
            Ok(Arc::new(adapters::PostgresTransactionRepository::new(pool)))
        }
    }
}
