// ==============================================================================
// main.rs - Analysis Worker Process
// ==============================================================================
// Description: Background worker that analyzes submissions from the Redis queue
// Author: Matt Barham
// Created: 2026-09-21
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::Client as RedisClient;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use analysis_worker::config::{StoreBackend, WorkerConfig};
use analysis_worker::insights::{FallbackInsightGenerator, HttpInsightGenerator, InsightGenerator};
use analysis_worker::progress::ProgressSchedule;
use analysis_worker::queue::SubmissionQueue;
use analysis_worker::store::{MemoryRunStore, PostgresRunStore, RedisRunStore, RunStore};
use analysis_worker::{Orchestrator, OrchestratorSettings, PipelineError};
use marker_processor::decoder::{Base64Decoder, DEFAULT_MAX_DECODED_BYTES};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marker_processor=info,analysis_worker=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the filter reads RUST_LOG
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Analysis Worker v{}", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;

    // Initialize Redis connection (submission queue)
    let redis_client = RedisClient::open(config.redis_url.as_str()).context("Failed to create Redis client")?;
    let redis_conn = ConnectionManager::new(redis_client)
        .await
        .context("Failed to create Redis connection manager")?;

    info!("Connected to Redis");

    let store: Arc<dyn RunStore> = match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory run store; run state is lost on restart");
            Arc::new(MemoryRunStore::new())
        }
        StoreBackend::Redis => Arc::new(RedisRunStore::new(redis_conn.clone())),
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            info!("Connected to PostgreSQL");

            let store = PostgresRunStore::new(pool);
            store.ensure_schema().await.context("Failed to prepare marker_runs table")?;
            Arc::new(store)
        }
    };

    let insights: Arc<dyn InsightGenerator> = match &config.insight_api_url {
        Some(url) => {
            info!("Insight service: {} (model {})", url, config.insight_model);
            Arc::new(
                HttpInsightGenerator::new(url.clone(), config.insight_api_key.clone(), config.insight_model.clone())
                    .context("Failed to build insight client")?,
            )
        }
        None => {
            warn!("INSIGHT_API_URL not set, every run will use the fallback insight bundle");
            Arc::new(FallbackInsightGenerator)
        }
    };

    let decoded_limit = DEFAULT_MAX_DECODED_BYTES.max(config.max_upload_bytes as u64);
    let orchestrator = Orchestrator::new(
        store,
        Arc::new(Base64Decoder::new(decoded_limit)),
        insights,
        OrchestratorSettings {
            schedule: ProgressSchedule::new(config.progress_delay),
            run_timeout: config.run_timeout,
            max_upload_bytes: config.max_upload_bytes,
        },
    );

    // Recover stuck runs from previous worker instance
    info!("Checking for stuck runs from previous worker instance...");
    if let Err(e) = orchestrator.recover_stuck_runs(config.stuck_run_threshold).await {
        error!("Failed to recover stuck runs: {}", e);
    }

    info!("Worker ready, waiting for submissions...");
    run(orchestrator, SubmissionQueue::new(redis_conn)).await
}

/// Main processing loop - polls Redis queue for submissions
async fn run(orchestrator: Orchestrator, mut queue: SubmissionQueue) -> Result<()> {
    loop {
        match queue.dequeue().await {
            Ok(Some(payload)) => {
                info!("Received submission for report {}", payload.report_id);

                // Runs continue in the background; the handle is not needed here
                match orchestrator.submit(payload.into()).await {
                    Ok(handle) => info!("Report {} started as run {}", handle.report_id(), handle.run_id()),
                    Err(PipelineError::AlreadyRunning(report_id)) => {
                        warn!("Ignoring duplicate submission for report {}", report_id)
                    }
                    Err(PipelineError::ReportExists(report_id)) => {
                        warn!("Ignoring resubmission of finished report {}", report_id)
                    }
                    Err(e) => error!("Failed to submit run: {}", e),
                }
            }
            Ok(None) => {
                // No submissions in queue, wait a bit
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => {
                error!("Failed to dequeue submission: {:#}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
