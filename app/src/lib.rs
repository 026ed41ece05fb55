// ==============================================================================
// lib.rs - Marker Processor Library
// ==============================================================================
// Description: Library interface for health marker extraction modules
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-09-30
// Version: 2.0.0
// ==============================================================================

pub mod catalog;
pub mod decoder;
pub mod detector;
pub mod filter;
pub mod models;
pub mod parsers;
pub mod processor;
pub mod validator;

pub use catalog::MarkerCatalog;
pub use decoder::{Base64Decoder, DecodeError, DecodedPayload, Decoder, RawDecoder};
pub use detector::{Dialect, FormatError};
pub use filter::HealthMarkerFilter;
pub use models::{DnaProvider, GeneticMarker, GeneticSummary};
pub use processor::{extract_health_markers, MarkerExtraction};
