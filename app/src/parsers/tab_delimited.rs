// ==============================================================================
// tab_delimited.rs - Tab-Delimited Consumer Report Parser
// ==============================================================================
// Description: Parser for 23andMe-style raw genome exports
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-09-22
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text with header comments
// Example:
//   # rsid    chromosome    position    genotype
//   rs548049170    1    69869    TT
//   rs13328684    1    74792    --
//   rs9283150    1    565508    AA
// ==============================================================================

use tracing::debug;

use super::{is_usable_call, parse_position, DialectParser};
use crate::detector::Dialect;
use crate::models::GeneticMarker;

/// Parser for tab-delimited consumer reports
#[derive(Debug, Clone, Copy, Default)]
pub struct TabDelimitedParser;

impl DialectParser for TabDelimitedParser {
    fn dialect(&self) -> Dialect {
        Dialect::TabDelimited
    }

    /// Parse `[rsid, chromosome, position, genotype, ...]` lines
    ///
    /// Lines starting with '#' are comments. A line is kept only when it has at
    /// least 4 fields, an `rs` id and a genotype other than "--". Non-numeric
    /// positions become 0.
    fn parse(&self, content: &str) -> Vec<GeneticMarker> {
        let mut markers = Vec::new();
        let mut skipped = 0usize;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < 4 {
                skipped += 1;
                continue;
            }

            let (rsid, chromosome, position, genotype) = (fields[0], fields[1], fields[2], fields[3]);
            if !is_usable_call(rsid, genotype) {
                skipped += 1;
                continue;
            }

            markers.push(GeneticMarker::raw(rsid, chromosome, parse_position(position), genotype));
        }

        debug!("Tab-delimited parse: {} markers, {} lines skipped", markers.len(), skipped);
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_report() {
        let contents = "\
# rsid\tchromosome\tposition\tgenotype
rs548049170\t1\t69869\tTT
rs13328684\t1\t74792\t--
rs9283150\t1\t565508\tAA
rs12345678\t2\t100000\tAG
";
        let markers = TabDelimitedParser.parse(contents);

        // No-call row is dropped
        assert_eq!(markers.len(), 3);

        assert_eq!(markers[0].rsid, "rs548049170");
        assert_eq!(markers[0].chromosome, "1");
        assert_eq!(markers[0].position, 69869);
        assert_eq!(markers[0].genotype, "TT");

        assert_eq!(markers[2].chromosome, "2");
        assert_eq!(markers[2].genotype, "AG");
        assert!(markers.iter().all(|m| !m.is_annotated()));
    }

    #[test]
    fn test_single_line_scenario() {
        let markers = TabDelimitedParser.parse("rs7412\t1\t1000\tTT\n");
        assert_eq!(markers, vec![GeneticMarker::raw("rs7412", "1", 1000, "TT")]);
    }

    #[test]
    fn test_bad_position_becomes_zero() {
        let markers = TabDelimitedParser.parse("rs548049170\t1\tNOT_A_NUMBER\tTT\n");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].position, 0);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let contents = "\
rs548049170\t1\t69869
i713426\t1\t100\tAA
rs1\t1\t100\tCC\textra\tcolumns

rs2\tX\t200\tGT
";
        let markers = TabDelimitedParser.parse(contents);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].rsid, "rs1");
        assert_eq!(markers[1].chromosome, "X");
    }

    #[test]
    fn test_whitespace_and_crlf_handling() {
        let contents = "# header\r\n  rs548049170  \t  1  \t  69869  \t  TT  \r\n";
        let markers = TabDelimitedParser.parse(contents);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].rsid, "rs548049170");
        assert_eq!(markers[0].position, 69869);
        assert_eq!(markers[0].genotype, "TT");
    }

    #[test]
    fn test_mixed_chromosomes() {
        let contents = "\
rs1\t1\t100\tAA
rs2\tX\t200\tXY
rs3\t10\t300\tGG
rs4\tY\t400\tTT
rs5\tMT\t600\tAA
";
        let markers = TabDelimitedParser.parse(contents);
        let chromosomes: Vec<&str> = markers.iter().map(|m| m.chromosome.as_str()).collect();
        assert_eq!(chromosomes, vec!["1", "X", "10", "Y", "MT"]);
    }

    #[test]
    fn test_comment_only_report_yields_nothing() {
        let contents = "# rsid\tchromosome\tposition\tgenotype\n# Just comments, no data\n";
        assert!(TabDelimitedParser.parse(contents).is_empty());
    }
}
