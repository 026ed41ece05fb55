// ==============================================================================
// parsers/vcf.rs - VCF record parser
// ==============================================================================
// Description: Extracts single-sample genotypes from VCF text
// Author: Matt Barham
// Created: 2026-09-16
// Modified: 2026-09-24
// Version: 2.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// ==============================================================================
// Column layout used here:
//   CHROM  POS  ID  REF  ALT  QUAL  FILTER  INFO  FORMAT  SAMPLE
// Only the first sample column is read. Headers are optional since consumer
// exports are frequently truncated to the record lines.
// ==============================================================================

use tracing::debug;

use super::{parse_position, DialectParser};
use crate::detector::Dialect;
use crate::models::GeneticMarker;

const MIN_COLUMNS: usize = 10;
const SAMPLE_COLUMN: usize = 9;

/// Parser for variant call records
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantCallParser;

/// Rebuild an allele pair from the leading GT indices of a sample field
///
/// Reads `digit[/|]digit` at the start of `sample`; index 0 resolves to the
/// REF allele and any other index to the ALT column. The pair is returned in
/// sorted order ("GA" -> "AG"). `None` means no usable genotype.
///
/// # Examples
/// ```
/// use marker_processor::parsers::reconstruct_genotype;
///
/// assert_eq!(reconstruct_genotype("0/1", "A", "G").as_deref(), Some("AG"));
/// assert_eq!(reconstruct_genotype("1|0:35", "T", "C").as_deref(), Some("CT"));
/// assert_eq!(reconstruct_genotype("./.", "A", "G"), None);
/// ```
pub fn reconstruct_genotype(sample: &str, ref_allele: &str, alt_allele: &str) -> Option<String> {
    let (first, second) = match sample.trim().as_bytes() {
        [a, b'/' | b'|', b, ..] if a.is_ascii_digit() && b.is_ascii_digit() => (*a, *b),
        _ => return None,
    };

    let resolve = |index: u8| if index == b'0' { ref_allele } else { alt_allele };

    let mut alleles = [resolve(first), resolve(second)];
    alleles.sort_unstable();
    Some(alleles.concat())
}

impl DialectParser for VariantCallParser {
    fn dialect(&self) -> Dialect {
        Dialect::VariantCallRecord
    }

    fn parse(&self, content: &str) -> Vec<GeneticMarker> {
        let mut markers = Vec::new();
        let mut skipped = 0usize;

        for line in content.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < MIN_COLUMNS {
                skipped += 1;
                continue;
            }

            let chromosome = fields[0];
            let position = fields[1];
            let id = fields[2];

            let genotype = match reconstruct_genotype(fields[SAMPLE_COLUMN], fields[3], fields[4]) {
                Some(genotype) => genotype,
                None => {
                    skipped += 1;
                    continue;
                }
            };

            // Novel variants get a positional pseudo-ID
            let rsid = if id.is_empty() || id == "." {
                format!("chr{}:{}", chromosome, position)
            } else {
                id.to_string()
            };

            markers.push(GeneticMarker::raw(rsid, chromosome, parse_position(position), genotype));
        }

        debug!("VCF parse: {} markers, {} records skipped", markers.len(), skipped);
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_id_and_sorted_genotype() {
        let markers = VariantCallParser.parse("1\t1000\t.\tA\tG\t.\t.\t.\t.\t0/1");
        assert_eq!(markers, vec![GeneticMarker::raw("chr1:1000", "1", 1000, "AG")]);
    }

    #[test]
    fn test_record_id_is_used_when_present() {
        let contents = "\
##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE
19\t44908822\trs7412\tC\tT\t50\tPASS\t.\tGT:GQ\t1|1:99
";
        let markers = VariantCallParser.parse(contents);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].rsid, "rs7412");
        assert_eq!(markers[0].chromosome, "19");
        assert_eq!(markers[0].position, 44908822);
        assert_eq!(markers[0].genotype, "TT");
    }

    #[test]
    fn test_genotype_reconstruction() {
        assert_eq!(reconstruct_genotype("0/0", "A", "G").as_deref(), Some("AA"));
        assert_eq!(reconstruct_genotype("1/0", "A", "G").as_deref(), Some("AG"));
        assert_eq!(reconstruct_genotype("1|1", "A", "G").as_deref(), Some("GG"));
        assert_eq!(reconstruct_genotype("0|1", "T", "C").as_deref(), Some("CT"));
        // Any non-zero index resolves to the ALT column as written
        assert_eq!(reconstruct_genotype("0/2", "A", "G,T").as_deref(), Some("AG,T"));
    }

    #[test]
    fn test_unusable_sample_fields() {
        assert_eq!(reconstruct_genotype("./.", "A", "G"), None);
        assert_eq!(reconstruct_genotype("0", "A", "G"), None);
        assert_eq!(reconstruct_genotype("", "A", "G"), None);
        assert_eq!(reconstruct_genotype("0-1", "A", "G"), None);
    }

    #[test]
    fn test_short_and_missing_records_are_skipped() {
        let contents = "\
1\t1000\t.\tA\tG\t.\t.\t.\t.
1\t2000\trs1\tA\tG\t.\t.\t.\tGT\t./.
1\t3000\trs2\tC\tT\t.\t.\t.\tGT\t0/1
";
        let markers = VariantCallParser.parse(contents);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].rsid, "rs2");
        assert_eq!(markers[0].genotype, "CT");
    }
}
