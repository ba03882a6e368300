use anyhow::Context;
use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Default tender capacity: 30,000 KL.
pub const DEFAULT_TENDER_CAPACITY_LITERS: &str = "30000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryBackend {
    Postgres,
    Memory,
}

impl FromStr for RepositoryBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(RepositoryBackend::Postgres),
            "memory" | "in-memory" => Ok(RepositoryBackend::Memory),
            other => anyhow::bail!("REPOSITORY_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub repository_backend: RepositoryBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub tender_capacity_liters: BigDecimal,
    pub cors_allowed_origins: AllowedOrigins,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let repository_backend = lookup("REPOSITORY_BACKEND")
            .map(|raw| raw.parse::<RepositoryBackend>())
            .transpose()?
            .unwrap_or(RepositoryBackend::Postgres);

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if repository_backend == RepositoryBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when REPOSITORY_BACKEND is postgres");
        }

        let tender_capacity_liters = BigDecimal::from_str(
            lookup("TENDER_CAPACITY_LITERS")
                .as_deref()
                .unwrap_or(DEFAULT_TENDER_CAPACITY_LITERS)
                .trim(),
        )
        .context("TENDER_CAPACITY_LITERS must be a number")?;
        if tender_capacity_liters <= BigDecimal::from(0) {
            anyhow::bail!("TENDER_CAPACITY_LITERS must be greater than zero");
        }

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Config {
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a port number")?,
            repository_backend,
            database_url,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            tender_capacity_liters,
            cors_allowed_origins: parse_allowed_origins(
                &lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),
            )?,
            log_format,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is not set")
    }
}

fn parse_allowed_origins(raw: &str) -> anyhow::Result<AllowedOrigins> {
    let value = raw.trim();
    if value == "*" {
        return Ok(AllowedOrigins::Any);
    }

    let origins = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            url::Url::parse(entry)
                .with_context(|| format!("invalid origin in CORS_ALLOWED_ORIGINS: {}", entry))?;
            Ok(entry.trim_end_matches('/').to_string())
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if origins.is_empty() {
        anyhow::bail!("CORS_ALLOWED_ORIGINS must be '*' or a comma-separated list of origins");
    }

    Ok(AllowedOrigins::List(origins))
}
