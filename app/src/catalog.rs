// ==============================================================================
// catalog.rs - Health Marker Catalog
// ==============================================================================
// Description: Read-only table of health-relevant variants used for filtering
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-09-14
// Version: 1.0.0
// ==============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Confidence attached to curated, high-evidence variants
pub const HIGH_CONFIDENCE: f64 = 0.85;

/// Confidence attached to every other catalog hit
pub const STANDARD_CONFIDENCE: f64 = 0.75;

/// Catalog metadata for one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub gene: &'static str,
    pub condition: &'static str,
    pub risk_allele: &'static str,
}

const fn entry(gene: &'static str, condition: &'static str, risk_allele: &'static str) -> CatalogEntry {
    CatalogEntry { gene, condition, risk_allele }
}

const BUILTIN_ENTRIES: &[(&str, CatalogEntry)] = &[
    ("rs7412", entry("APOE", "Alzheimer's risk", "T")),
    ("rs429358", entry("APOE", "Cardiovascular risk", "C")),
    ("rs1801282", entry("PPARG", "Type 2 Diabetes", "G")),
    ("rs1800497", entry("DRD2", "Addiction susceptibility", "A")),
    ("rs1815739", entry("ACTN3", "Athletic performance", "T")),
    ("rs1799752", entry("ACE", "Athletic endurance", "D")),
    ("rs1801133", entry("MTHFR", "Folate metabolism", "T")),
    ("rs2032582", entry("COMT", "Stress response", "T")),
    ("rs12255372", entry("TCF7L2", "Type 2 Diabetes", "T")),
    ("rs4988235", entry("LCT", "Lactose tolerance", "C")),
];

const HIGH_CONFIDENCE_IDS: &[&str] = &["rs7412", "rs429358", "rs1801133"];

/// Exact-match lookup table from variant id to catalog entry
///
/// Built once per process (see [`MarkerCatalog::global`]) and never mutated,
/// so concurrent analysis runs share it without locking.
#[derive(Debug)]
pub struct MarkerCatalog {
    entries: HashMap<&'static str, CatalogEntry>,
    high_confidence: HashSet<&'static str>,
}

impl MarkerCatalog {
    /// Build the catalog from the built-in table
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_ENTRIES.iter().copied().collect(),
            high_confidence: HIGH_CONFIDENCE_IDS.iter().copied().collect(),
        }
    }

    /// Process-wide shared catalog
    pub fn global() -> &'static MarkerCatalog {
        static CATALOG: OnceLock<MarkerCatalog> = OnceLock::new();
        CATALOG.get_or_init(MarkerCatalog::builtin)
    }

    /// Look up a variant id; `None` means "not of interest", not an error
    pub fn lookup(&self, rsid: &str) -> Option<&CatalogEntry> {
        self.entries.get(rsid)
    }

    pub fn contains(&self, rsid: &str) -> bool {
        self.entries.contains_key(rsid)
    }

    /// Confidence score for a catalog hit
    pub fn confidence_for(&self, rsid: &str) -> f64 {
        if self.high_confidence.contains(rsid) {
            HIGH_CONFIDENCE
        } else {
            STANDARD_CONFIDENCE
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over catalog variant ids (unordered)
    pub fn variant_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_exact_match_only() {
        let catalog = MarkerCatalog::builtin();

        let apoe = catalog.lookup("rs7412").unwrap();
        assert_eq!(apoe.gene, "APOE");
        assert_eq!(apoe.condition, "Alzheimer's risk");
        assert_eq!(apoe.risk_allele, "T");

        assert!(catalog.lookup("RS7412").is_none());
        assert!(catalog.lookup("rs74").is_none());
        assert!(catalog.lookup("rs99999999").is_none());
    }

    #[test]
    fn test_confidence_tiers() {
        let catalog = MarkerCatalog::builtin();
        assert_eq!(catalog.confidence_for("rs7412"), HIGH_CONFIDENCE);
        assert_eq!(catalog.confidence_for("rs429358"), HIGH_CONFIDENCE);
        assert_eq!(catalog.confidence_for("rs1801133"), HIGH_CONFIDENCE);
        assert_eq!(catalog.confidence_for("rs4988235"), STANDARD_CONFIDENCE);
    }

    #[test]
    fn test_high_confidence_ids_are_catalogued() {
        let catalog = MarkerCatalog::builtin();
        for rsid in HIGH_CONFIDENCE_IDS {
            assert!(catalog.contains(rsid), "{} missing from catalog", rsid);
        }
        assert_eq!(catalog.len(), 10);
    }

    #[test]
    fn test_global_is_shared() {
        let a = MarkerCatalog::global() as *const MarkerCatalog;
        let b = MarkerCatalog::global() as *const MarkerCatalog;
        assert_eq!(a, b);
    }
}
