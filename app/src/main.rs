// ==============================================================================
// main.rs - Marker Processor Entry Point
// ==============================================================================
// Description: Command-line extraction of health markers from a genome export
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-02
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marker_processor::decoder::{Base64Decoder, Decoder, RawDecoder, DEFAULT_MAX_DECODED_BYTES};
use marker_processor::validator::{UploadValidator, MAX_UPLOAD_SIZE};
use marker_processor::{extract_health_markers, DnaProvider, MarkerExtraction};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Genome export to analyze (.txt, .csv, .vcf, optionally gzipped)
    #[arg(short, long)]
    input: PathBuf,

    /// Treat the input file as base64-encoded
    #[arg(long)]
    base64: bool,

    /// Declared DNA provider (23andme, ancestrydna, myheritage, ftdna, generic)
    #[arg(short, long, default_value = "generic")]
    provider: DnaProvider,

    /// Upload size limit in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = MAX_UPLOAD_SIZE)]
    max_upload_bytes: usize,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    filename: String,
    provider: DnaProvider,
    file_size: usize,
    compressed: bool,
    sha256: String,
    #[serde(flatten)]
    extraction: MarkerExtraction,
}

fn analyze(args: &Args) -> Result<Report> {
    let raw = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let decoded_limit = DEFAULT_MAX_DECODED_BYTES.max(args.max_upload_bytes as u64);
    let payload = if args.base64 {
        Base64Decoder::new(decoded_limit).decode(&raw)?
    } else {
        RawDecoder::new(decoded_limit).decode(&raw)?
    };

    let filename = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let upload = UploadValidator::with_max_size(args.max_upload_bytes)
        .validate(&filename, payload.text.as_bytes())?;
    info!(
        "Validated {} ({} bytes, sha256 {})",
        upload.safe_name, upload.size, upload.hash_sha256
    );

    let extraction = extract_health_markers(&payload.text, &upload.safe_name, args.provider)?;
    if extraction.is_empty() {
        warn!("No health-relevant markers found in {}", upload.safe_name);
    }

    Ok(Report {
        filename: upload.safe_name,
        provider: args.provider,
        file_size: payload.file_size,
        compressed: payload.compressed,
        sha256: upload.hash_sha256,
        extraction,
    })
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean JSON document
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marker_processor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("Marker Processor starting on {}", args.input.display());

    let report = analyze(&args)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);

    Ok(())
}
