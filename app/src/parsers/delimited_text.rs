// ==============================================================================
// delimited_text.rs - Comma-Delimited Vendor Export Parser
// ==============================================================================
// Description: Parser for AncestryDNA / MyHeritage style CSV exports
// Author: Matt Barham
// Created: 2026-09-16
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================
// Format: Comma-separated, fields optionally quote-wrapped, optional header
// Example:
//   RSID,CHROMOSOME,POSITION,RESULT
//   "rs4477212","1","82154","AA"
//   "rs3094315","1","752566","AG"
// ==============================================================================

use tracing::debug;

use super::{is_usable_call, parse_position, DialectParser};
use crate::detector::Dialect;
use crate::models::GeneticMarker;

/// Parser for comma-delimited vendor exports
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTextParser;

/// Blank row: every field empty after trimming
fn is_blank_record(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| unquote(field).is_empty())
}

/// Comment row, including indented `#` lines the reader does not strip
fn is_comment_record(record: &csv::StringRecord) -> bool {
    record.get(0).is_some_and(|field| field.trim_start().starts_with('#'))
}

/// Column header row ("rsid" or "chromosome" in any field, any case)
fn is_header_record(record: &csv::StringRecord) -> bool {
    record.iter().any(|field| {
        let lower = unquote(field).to_ascii_lowercase();
        lower.contains("rsid") || lower.contains("chromosome")
    })
}

impl DialectParser for DelimitedTextParser {
    fn dialect(&self) -> Dialect {
        Dialect::DelimitedText
    }

    fn parse(&self, content: &str) -> Vec<GeneticMarker> {
        // Quoting stays off so an unbalanced quote cannot swallow later rows;
        // surrounding quotes are stripped per field instead.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(content.as_bytes());

        let mut markers = Vec::new();
        let mut skipped = 0usize;
        let mut header_checked = false;

        for (index, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping unreadable CSV row {}: {}", index + 1, e);
                    skipped += 1;
                    continue;
                }
            };

            if is_blank_record(&record) || is_comment_record(&record) {
                continue;
            }

            // Only the first data row may be a header
            if !header_checked {
                header_checked = true;
                if is_header_record(&record) {
                    continue;
                }
            }

            if record.len() < 4 {
                skipped += 1;
                continue;
            }

            let rsid = unquote(&record[0]);
            let chromosome = unquote(&record[1]);
            let position = unquote(&record[2]);
            let genotype = unquote(&record[3]);

            if !is_usable_call(rsid, genotype) {
                skipped += 1;
                continue;
            }

            markers.push(GeneticMarker::raw(rsid, chromosome, parse_position(position), genotype));
        }

        debug!("Delimited-text parse: {} markers, {} rows skipped", markers.len(), skipped);
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_skipped() {
        let contents = "rsid,chromosome,position,genotype\nrs1801133,1,11856378,CT\n";
        let markers = DelimitedTextParser.parse(contents);
        assert_eq!(markers, vec![GeneticMarker::raw("rs1801133", "1", 11856378, "CT")]);
    }

    #[test]
    fn test_header_detection_is_case_insensitive() {
        let upper = DelimitedTextParser.parse("RSID,CHROMOSOME,POSITION,RESULT\nrs1,1,100,AA\n");
        assert_eq!(upper.len(), 1);

        let after_comment = DelimitedTextParser.parse("#AncestryDNA raw data\n\nrsid,chr,pos,allele\nrs1,1,100,AA\n");
        assert_eq!(after_comment.len(), 1);
        assert_eq!(after_comment[0].rsid, "rs1");
    }

    #[test]
    fn test_indented_comment_does_not_hide_header() {
        let contents = "  # exported 2024-01-01\nrsid,chromosome,position,genotype\nrs7412,19,44908822,CT\n";
        let markers = DelimitedTextParser.parse(contents);
        assert_eq!(markers, vec![GeneticMarker::raw("rs7412", "19", 44908822, "CT")]);
    }

    #[test]
    fn test_unbalanced_quote_stays_on_its_line() {
        let contents = "rsid,chromosome,position,genotype\nrs1,1,100,\"AA\nrs7412,19,44908822,CT\nrs429358,19,44908684,TT\n";
        let markers = DelimitedTextParser.parse(contents);
        let ids: Vec<&str> = markers.iter().map(|m| m.rsid.as_str()).collect();

        assert_eq!(ids, vec!["rs1", "rs7412", "rs429358"]);
        assert_eq!(markers[0].genotype, "AA");
        assert!(markers.iter().all(|m| !m.genotype.contains('\n')));
    }

    #[test]
    fn test_quoted_fields_are_unwrapped() {
        let contents = "\
RSID,CHROMOSOME,POSITION,RESULT
\"rs4477212\",\"1\",\"82154\",\"AA\"
\"rs3094315\",\"1\",\"752566\",\"AG\"
";
        let markers = DelimitedTextParser.parse(contents);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].rsid, "rs4477212");
        assert_eq!(markers[0].position, 82154);
        assert_eq!(markers[1].genotype, "AG");
    }

    #[test]
    fn test_comments_and_bad_rows_are_skipped() {
        let contents = "\
#MyHeritage DNA raw data.
RSID,CHROMOSOME,POSITION,RESULT
rs1,1,100,--
rs2,1,200,
rs3,1
VG1000,1,300,AA
rs4,2,four hundred,GG

rs5,3,500,CT
";
        let markers = DelimitedTextParser.parse(contents);
        let ids: Vec<&str> = markers.iter().map(|m| m.rsid.as_str()).collect();
        assert_eq!(ids, vec!["rs4", "rs5"]);
        assert_eq!(markers[0].position, 0);
    }

    #[test]
    fn test_headerless_export() {
        let contents = "rs7412,19,44908822,CT\nrs429358,19,44908684,TT\n";
        let markers = DelimitedTextParser.parse(contents);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].rsid, "rs429358");
    }
}
