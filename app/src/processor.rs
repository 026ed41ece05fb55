// ==============================================================================
// processor.rs - Health Marker Extraction
// ==============================================================================
// Description: Detect -> parse -> filter for one decoded genome export
// Author: Matt Barham
// Created: 2026-09-19
// Modified: 2026-09-30
// Version: 2.1.0
// ==============================================================================

use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::catalog::MarkerCatalog;
use crate::detector::{detect, Dialect, FormatError};
use crate::filter::HealthMarkerFilter;
use crate::models::{DnaProvider, GeneticMarker, GeneticSummary};
use crate::parsers::parser_for;

/// Result of extracting health markers from one export
#[derive(Debug, Clone, Serialize)]
pub struct MarkerExtraction {
    pub dialect: Dialect,
    /// Raw observations that survived row-level parsing
    pub raw_marker_count: usize,
    /// Catalog hits, annotated, in file order
    pub markers: Vec<GeneticMarker>,
    pub summary: GeneticSummary,
}

impl MarkerExtraction {
    /// A recognized export that produced no health markers
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Extract health-relevant markers from decoded export text
///
/// Fails only when no dialect matches; row-level problems just reduce yield.
pub fn extract_health_markers(
    content: &str,
    filename: &str,
    provider: DnaProvider,
) -> Result<MarkerExtraction, FormatError> {
    extract_with_catalog(content, filename, provider, MarkerCatalog::global())
}

pub fn extract_with_catalog(
    content: &str,
    filename: &str,
    provider: DnaProvider,
    catalog: &MarkerCatalog,
) -> Result<MarkerExtraction, FormatError> {
    let started = Instant::now();

    let dialect = detect(content, filename, provider)?;
    let raw_markers = parser_for(dialect).parse(content);

    let filter = HealthMarkerFilter::new(catalog);
    let markers = filter.apply(&raw_markers);
    let summary = filter.summarize(&markers);

    info!(
        "Processed {} total markers, {} health-relevant ({} from {}, provider {}) in {:?}",
        raw_markers.len(),
        markers.len(),
        dialect,
        filename,
        provider,
        started.elapsed()
    );

    Ok(MarkerExtraction {
        dialect,
        raw_marker_count: raw_markers.len(),
        markers,
        summary,
    })
}
