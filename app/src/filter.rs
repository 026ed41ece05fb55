// ==============================================================================
// filter.rs - Health Marker Filter
// ==============================================================================
// Description: Cross-references raw markers against the health marker catalog
// Author: Matt Barham
// Created: 2026-09-17
// Modified: 2026-09-29
// Version: 1.1.0
// ==============================================================================

use std::collections::BTreeSet;

use crate::catalog::MarkerCatalog;
use crate::models::{GeneticMarker, GeneticSummary};

/// Confidence above which a marker counts as high-confidence in summaries
const SUMMARY_HIGH_CONFIDENCE: f64 = 0.8;

/// Pure, order-preserving catalog filter
#[derive(Debug, Clone, Copy)]
pub struct HealthMarkerFilter<'a> {
    catalog: &'a MarkerCatalog,
}

impl Default for HealthMarkerFilter<'static> {
    fn default() -> Self {
        Self::new(MarkerCatalog::global())
    }
}

impl<'a> HealthMarkerFilter<'a> {
    pub fn new(catalog: &'a MarkerCatalog) -> Self {
        Self { catalog }
    }

    /// Keep catalog hits, annotated with risk allele, condition and confidence
    ///
    /// Markers whose id is not catalogued are dropped entirely.
    pub fn apply(&self, markers: &[GeneticMarker]) -> Vec<GeneticMarker> {
        markers
            .iter()
            .filter_map(|marker| {
                self.catalog.lookup(&marker.rsid).map(|entry| {
                    marker.annotated(
                        entry.risk_allele,
                        entry.condition,
                        self.catalog.confidence_for(&marker.rsid),
                    )
                })
            })
            .collect()
    }

    /// Summarize a filtered marker set
    pub fn summarize(&self, markers: &[GeneticMarker]) -> GeneticSummary {
        let conditions: BTreeSet<&str> = markers.iter().filter_map(|m| m.effect.as_deref()).collect();

        let genes: BTreeSet<&str> = markers
            .iter()
            .filter_map(|m| self.catalog.lookup(&m.rsid))
            .map(|entry| entry.gene)
            .collect();

        let high_confidence_markers = markers
            .iter()
            .filter(|m| m.confidence.is_some_and(|c| c > SUMMARY_HIGH_CONFIDENCE))
            .count();

        GeneticSummary {
            total_markers: markers.len(),
            conditions_analyzed: conditions.into_iter().map(String::from).collect(),
            high_confidence_markers,
            genes_analyzed: genes.into_iter().map(String::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{HIGH_CONFIDENCE, STANDARD_CONFIDENCE};

    fn raw(rsid: &str, genotype: &str) -> GeneticMarker {
        GeneticMarker::raw(rsid, "1", 1000, genotype)
    }

    #[test]
    fn test_high_confidence_hit() {
        let filtered = HealthMarkerFilter::default().apply(&[raw("rs7412", "TT")]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].risk_allele.as_deref(), Some("T"));
        assert_eq!(filtered[0].effect.as_deref(), Some("Alzheimer's risk"));
        assert_eq!(filtered[0].confidence, Some(HIGH_CONFIDENCE));
    }

    #[test]
    fn test_standard_confidence_hit() {
        let filtered = HealthMarkerFilter::default().apply(&[raw("rs4988235", "CT")]);
        assert_eq!(filtered[0].effect.as_deref(), Some("Lactose tolerance"));
        assert_eq!(filtered[0].confidence, Some(STANDARD_CONFIDENCE));
    }

    #[test]
    fn test_misses_are_excluded_and_order_preserved() {
        let input = vec![
            raw("rs1801133", "CT"),
            raw("rs0000001", "AA"),
            raw("chr1:1000", "AG"),
            raw("rs7412", "CC"),
            raw("rs9999999", "GG"),
            raw("rs429358", "TC"),
        ];

        let filtered = HealthMarkerFilter::default().apply(&input);
        let ids: Vec<&str> = filtered.iter().map(|m| m.rsid.as_str()).collect();
        assert_eq!(ids, vec!["rs1801133", "rs7412", "rs429358"]);

        let catalog = MarkerCatalog::global();
        assert!(filtered.iter().all(|m| catalog.contains(&m.rsid)));
        assert!(filtered.iter().all(GeneticMarker::is_annotated));
    }

    #[test]
    fn test_empty_input() {
        assert!(HealthMarkerFilter::default().apply(&[]).is_empty());
    }

    #[test]
    fn test_summary() {
        let filter = HealthMarkerFilter::default();
        let filtered = filter.apply(&[
            raw("rs7412", "TT"),
            raw("rs429358", "CC"),
            raw("rs1801282", "CG"),
            raw("rs12255372", "GT"),
        ]);

        let summary = filter.summarize(&filtered);
        assert_eq!(summary.total_markers, 4);
        assert_eq!(summary.high_confidence_markers, 2);
        assert_eq!(summary.genes_analyzed, vec!["APOE", "PPARG", "TCF7L2"]);
        assert_eq!(
            summary.conditions_analyzed,
            vec!["Alzheimer's risk", "Cardiovascular risk", "Type 2 Diabetes"]
        );
    }
}
