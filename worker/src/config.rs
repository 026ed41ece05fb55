// ==============================================================================
// config.rs - Worker Configuration
// ==============================================================================
// Description: Environment-driven settings for the analysis worker
// Author: Matt Barham
// Created: 2026-09-26
// Modified: 2026-10-05
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use marker_processor::validator::MAX_UPLOAD_SIZE;

use crate::progress::DEFAULT_PACING;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_INSIGHT_MODEL: &str = "gpt-4o";
const DEFAULT_STUCK_RUN_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => anyhow::bail!("Unknown RUN_STORE '{}' (expected memory, redis or postgres)", other),
        }
    }
}

/// Worker configuration from environment variables
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub database_url: Option<String>,
    pub insight_api_url: Option<String>,
    pub insight_api_key: Option<String>,
    pub insight_model: String,
    pub progress_delay: Duration,
    pub run_timeout: Option<Duration>,
    pub max_upload_bytes: usize,
    pub stuck_run_threshold: chrono::Duration,
}

impl WorkerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store_backend = match var("RUN_STORE") {
            Some(value) => value.parse()?,
            None => StoreBackend::Redis,
        };

        let database_url = match var("DATABASE_URL") {
            Some(url) => Some(url),
            None => var("DATABASE_URL_FILE").map(|path| read_secret_file(&path)).transpose()?,
        };
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL or DATABASE_URL_FILE must be provided when RUN_STORE=postgres");
        }

        let insight_api_key = match var("INSIGHT_API_KEY") {
            Some(key) => Some(key),
            None => var("INSIGHT_API_KEY_FILE").map(|path| read_secret_file(&path)).transpose()?,
        };

        let progress_delay = match var("PROGRESS_DELAY_MS") {
            Some(ms) => Duration::from_millis(ms.parse::<u64>().context("PROGRESS_DELAY_MS must be an integer")?),
            None => DEFAULT_PACING,
        };

        let run_timeout = var("RUN_TIMEOUT_SECS")
            .map(|secs| secs.parse::<u64>().map(Duration::from_secs))
            .transpose()
            .context("RUN_TIMEOUT_SECS must be an integer")?;

        let max_upload_bytes = var("MAX_UPLOAD_BYTES")
            .map(|bytes| bytes.parse::<usize>())
            .transpose()
            .context("MAX_UPLOAD_BYTES must be an integer")?
            .unwrap_or(MAX_UPLOAD_SIZE);

        let stuck_minutes = var("STUCK_RUN_MINUTES")
            .map(|minutes| minutes.parse::<i64>())
            .transpose()
            .context("STUCK_RUN_MINUTES must be an integer")?
            .unwrap_or(DEFAULT_STUCK_RUN_MINUTES);

        Ok(Self {
            store_backend,
            redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            database_url,
            insight_api_url: var("INSIGHT_API_URL"),
            insight_api_key,
            insight_model: var("INSIGHT_MODEL").unwrap_or_else(|| DEFAULT_INSIGHT_MODEL.to_string()),
            progress_delay,
            run_timeout,
            max_upload_bytes,
            stuck_run_threshold: chrono::Duration::minutes(stuck_minutes),
        })
    }
}

fn read_secret_file(path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read secret file {}", path))?
        .trim()
        .to_string())
}
