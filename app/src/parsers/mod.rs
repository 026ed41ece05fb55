// ==============================================================================
// parsers/mod.rs - Raw export dialect parsers
// ==============================================================================
// Description: Parsers for consumer genome export dialects
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-09-30
// Version: 2.0.0
// ==============================================================================

pub mod delimited_text;
pub mod tab_delimited;
pub mod vcf;

pub use delimited_text::DelimitedTextParser;
pub use tab_delimited::TabDelimitedParser;
pub use vcf::{reconstruct_genotype, VariantCallParser};

use crate::detector::Dialect;
use crate::models::GeneticMarker;

/// Missing-data sentinel used by consumer exports
pub const NO_CALL: &str = "--";

/// Uniform parse capability shared by every dialect
///
/// Comment, blank and malformed lines are skipped silently; they reduce yield
/// but never fail the payload.
pub trait DialectParser: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn parse(&self, content: &str) -> Vec<GeneticMarker>;
}

/// Parser for a detected dialect
pub fn parser_for(dialect: Dialect) -> &'static dyn DialectParser {
    match dialect {
        Dialect::TabDelimited => &TabDelimitedParser,
        Dialect::DelimitedText => &DelimitedTextParser,
        Dialect::VariantCallRecord => &VariantCallParser,
    }
}

/// Position column value, 0 when not a plain unsigned integer
pub(crate) fn parse_position(value: &str) -> u64 {
    if value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().unwrap_or(0)
    } else {
        0
    }
}

/// Row filter shared by the consumer-report dialects
pub(crate) fn is_usable_call(rsid: &str, genotype: &str) -> bool {
    rsid.starts_with("rs") && !genotype.is_empty() && genotype != NO_CALL
}
