// ==============================================================================
// detector.rs - Raw Export Format Detection
// ==============================================================================
// Description: Classifies decoded genome exports into a supported dialect
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-09-30
// Version: 1.1.0
// ==============================================================================
// Detection is a best-effort heuristic. Vendor exports carry no reliable
// content-type metadata, so the result is a guess, not a validation.
//
// Content rules (priority order):
//   1. tab + "rs"                   -> TabDelimited
//   2. comma + "rs"                 -> DelimitedText
//   3. "#CHROM" or "CHROM\tPOS"     -> VariantCallRecord
//   4. otherwise                    -> UnrecognizedFormat
//
// Filename extensions are a fast path that is only honoured when the payload
// contains the hinted dialect's field delimiter.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::DnaProvider;

/// Supported raw export dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Tab-separated consumer report (23andMe style)
    TabDelimited,
    /// Comma-separated vendor export (AncestryDNA, MyHeritage)
    DelimitedText,
    /// Variant Call Format records
    VariantCallRecord,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::TabDelimited => "tab_delimited",
            Dialect::DelimitedText => "delimited_text",
            Dialect::VariantCallRecord => "variant_call_record",
        }
    }

    /// Field delimiter every well-formed payload of this dialect contains
    pub fn field_delimiter(&self) -> char {
        match self {
            Dialect::TabDelimited | Dialect::VariantCallRecord => '\t',
            Dialect::DelimitedText => ',',
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-payload format failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unrecognized file format")]
    UnrecognizedFormat,
}

/// Classify a payload from its content alone
///
/// Pure function of `content`: the same payload always yields the same answer.
pub fn classify_content(content: &str) -> Option<Dialect> {
    let mentions_rsid = content.contains("rs");

    if content.contains('\t') && mentions_rsid {
        Some(Dialect::TabDelimited)
    } else if content.contains(',') && mentions_rsid {
        Some(Dialect::DelimitedText)
    } else if content.contains("#CHROM") || content.contains("CHROM\tPOS") {
        Some(Dialect::VariantCallRecord)
    } else {
        None
    }
}

/// Weak dialect hint from the uploaded filename
///
/// A trailing `.gz` is ignored since compressed payloads are inflated before
/// detection.
pub fn dialect_from_filename(filename: &str) -> Option<Dialect> {
    let lower = filename.trim().to_ascii_lowercase();
    let name = lower.strip_suffix(".gz").unwrap_or(&lower);

    if name.ends_with(".txt") || name.ends_with(".tsv") {
        Some(Dialect::TabDelimited)
    } else if name.ends_with(".csv") {
        Some(Dialect::DelimitedText)
    } else if name.ends_with(".vcf") {
        Some(Dialect::VariantCallRecord)
    } else {
        None
    }
}

/// Pick the dialect for an uploaded payload
///
/// The extension hint wins when the payload contains its delimiter; otherwise
/// the content heuristic decides. The declared provider is logged only.
pub fn detect(content: &str, filename: &str, provider: DnaProvider) -> Result<Dialect, FormatError> {
    let from_content = classify_content(content);

    if let Some(hinted) = dialect_from_filename(filename) {
        if content.contains(hinted.field_delimiter()) {
            if let Some(guessed) = from_content.filter(|guessed| *guessed != hinted) {
                warn!(
                    "Extension of '{}' suggests {}, content suggests {} (provider: {}); using {}",
                    filename, hinted, guessed, provider, hinted
                );
            }
            debug!("Detected {} from filename '{}'", hinted, filename);
            return Ok(hinted);
        }

        debug!(
            "Filename '{}' suggests {} but payload has no '{}' delimiter, falling back to content detection",
            filename,
            hinted,
            hinted.field_delimiter().escape_default()
        );
    }

    match from_content {
        Some(dialect) => {
            debug!("Detected {} from content (provider: {})", dialect, provider);
            Ok(dialect)
        }
        None => Err(FormatError::UnrecognizedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(classify_content("rs7412\t1\t1000\tTT\n"), Some(Dialect::TabDelimited));
        assert_eq!(
            classify_content("rsid,chromosome,position,genotype\nrs1801133,1,11856378,CT\n"),
            Some(Dialect::DelimitedText)
        );
        assert_eq!(
            classify_content("#CHROM POS ID REF ALT\n1 1000 . A G\n"),
            Some(Dialect::VariantCallRecord)
        );

        // Tab wins over comma when both are present
        assert_eq!(classify_content("rs1\t1,2\t3\tAA"), Some(Dialect::TabDelimited));
    }

    #[test]
    fn test_vcf_without_rsids_is_detected_by_header() {
        let content = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n";
        // Contains tabs but no "rs" substring
        assert_eq!(classify_content(content), Some(Dialect::VariantCallRecord));
    }

    #[test]
    fn test_unrecognized_payload() {
        assert_eq!(classify_content("hello world"), None);
        assert_eq!(classify_content(""), None);
        assert_eq!(
            detect("just some prose", "notes.bin", DnaProvider::Generic),
            Err(FormatError::UnrecognizedFormat)
        );
    }

    #[test]
    fn test_classification_is_idempotent() {
        let payloads = [
            "rs7412\t1\t1000\tTT\n",
            "rsid,chromosome\nrs1,1",
            "#CHROM\tPOS\n",
            "garbage",
        ];
        for payload in payloads {
            assert_eq!(classify_content(payload), classify_content(payload));
        }
    }

    #[test]
    fn test_filename_hints() {
        assert_eq!(dialect_from_filename("genome_John_Doe.txt"), Some(Dialect::TabDelimited));
        assert_eq!(dialect_from_filename("AncestryDNA.CSV"), Some(Dialect::DelimitedText));
        assert_eq!(dialect_from_filename("sample.vcf.gz"), Some(Dialect::VariantCallRecord));
        assert_eq!(dialect_from_filename("upload.bin"), None);
        assert_eq!(dialect_from_filename(""), None);
    }

    #[test]
    fn test_extension_hint_needs_matching_delimiter() {
        // A .txt export that is really comma-delimited falls back to content
        let csv_in_txt = "rsid,chromosome,position,genotype\nrs7412,19,44908822,CT\n";
        assert_eq!(
            detect(csv_in_txt, "export.txt", DnaProvider::AncestryDna),
            Ok(Dialect::DelimitedText)
        );

        // A .vcf file with rsids would look tab-delimited to the content rules
        let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
                   19\t44908822\trs7412\tC\tT\t.\tPASS\t.\tGT\t0/1\n";
        assert_eq!(classify_content(vcf), Some(Dialect::TabDelimited));
        assert_eq!(detect(vcf, "sample.vcf", DnaProvider::Generic), Ok(Dialect::VariantCallRecord));
    }

    #[test]
    fn test_extension_hint_cannot_rescue_unrecognized_content() {
        assert_eq!(
            detect("no delimiters here", "genome.txt", DnaProvider::TwentyThreeAndMe),
            Err(FormatError::UnrecognizedFormat)
        );
    }
}
