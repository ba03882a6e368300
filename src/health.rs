use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::ports::TransactionRepository;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: HashMap<String, DependencyStatus>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyStatus {
    Healthy { status: String, latency_ms: u64 },
    Unhealthy { status: String, error: String },
}

impl DependencyStatus {
    fn unhealthy(error: impl Into<String>) -> Self {
        DependencyStatus::Unhealthy {
            status: "unhealthy".to_string(),
            error: error.into(),
        }
    }
}

#[async_trait]
pub trait DependencyChecker: Send + Sync {
    async fn check(&self) -> DependencyStatus;
}

/// Health of whichever transaction store is configured.
pub struct RepositoryChecker {
    repo: Arc<dyn TransactionRepository>,
}

impl RepositoryChecker {
    pub fn new(repo: Arc<dyn TransactionRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl DependencyChecker for RepositoryChecker {
    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match self.repo.ping().await {
            Ok(()) => DependencyStatus::Healthy {
                status: "healthy".to_string(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => DependencyStatus::unhealthy(e.to_string()),
        }
    }
}

pub async fn check_health(repository: &RepositoryChecker, start_time: Instant) -> HealthResponse {
    let result = timeout(CHECK_TIMEOUT, repository.check())
        .await
        .unwrap_or_else(|_| DependencyStatus::unhealthy("timeout"));

    let mut dependencies = HashMap::new();
    dependencies.insert("repository".to_string(), result);

    HealthResponse {
        status: determine_overall_status(&dependencies),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        dependencies,
    }
}

fn determine_overall_status(dependencies: &HashMap<String, DependencyStatus>) -> String {
    let unhealthy = dependencies
        .values()
        .any(|status| matches!(status, DependencyStatus::Unhealthy { .. }));

    if unhealthy {
        "unhealthy".to_string()
    } else {
        "healthy".to_string()
    }
}
