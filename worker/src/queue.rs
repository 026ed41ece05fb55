// ==============================================================================
// queue.rs - Redis Submission Queue (Worker Side)
// ==============================================================================
// Description: Consume analysis submissions from Redis
// Author: Matt Barham
// Created: 2026-09-26
// Modified: 2026-10-02
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use marker_processor::DnaProvider;

use crate::orchestrator::Submission;
use crate::run::SubjectProfile;

const QUEUE_KEY: &str = "markers:submission_queue";

/// Pub/sub channel carrying progress updates for one report
pub fn progress_channel(report_id: &str) -> String {
    format!("markers:progress:{}", report_id)
}

/// Submission payload from the Redis queue
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub report_id: String,
    pub filename: String,
    #[serde(default)]
    pub provider: DnaProvider,
    /// Uploaded file, base64 encoded (optionally gzip-compressed before encoding)
    pub encoded_content: String,
    #[serde(default)]
    pub profile: SubjectProfile,
}

impl From<SubmissionPayload> for Submission {
    fn from(payload: SubmissionPayload) -> Self {
        Submission {
            report_id: payload.report_id,
            encoded_content: payload.encoded_content.into_bytes(),
            filename: payload.filename,
            provider: payload.provider,
            profile: payload.profile,
        }
    }
}

pub fn parse_payload(json: &str) -> Result<SubmissionPayload> {
    serde_json::from_str(json).context("Failed to deserialize submission payload")
}

/// Submission queue consumer
pub struct SubmissionQueue {
    conn: ConnectionManager,
}

impl SubmissionQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Dequeue a submission (blocking pop with timeout)
    pub async fn dequeue(&mut self) -> Result<Option<SubmissionPayload>> {
        // BRPOP with 1 second timeout
        let result: Option<(String, String)> = self
            .conn
            .brpop(QUEUE_KEY, 1.0)
            .await
            .context("Failed to pop from queue")?;

        match result {
            Some((_, payload_json)) => Ok(Some(parse_payload(&payload_json)?)),
            None => Ok(None),
        }
    }
}
