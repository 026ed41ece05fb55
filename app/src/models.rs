// ==============================================================================
// models.rs - Genetic Marker Data Models
// ==============================================================================
// Description: Data structures shared by the parsers, filter and worker
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-09-29
// Version: 1.1.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Consumer genomics vendor declared by the uploader
///
/// Informational only: the declared provider never overrides format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnaProvider {
    #[serde(rename = "23andme")]
    TwentyThreeAndMe,
    AncestryDna,
    MyHeritage,
    FamilyTreeDna,
    #[default]
    Generic,
}

impl DnaProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnaProvider::TwentyThreeAndMe => "23andme",
            DnaProvider::AncestryDna => "ancestrydna",
            DnaProvider::MyHeritage => "myheritage",
            DnaProvider::FamilyTreeDna => "familytreedna",
            DnaProvider::Generic => "generic",
        }
    }
}

impl fmt::Display for DnaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnaProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "23andme" => Ok(DnaProvider::TwentyThreeAndMe),
            "ancestrydna" | "ancestry" => Ok(DnaProvider::AncestryDna),
            "myheritage" => Ok(DnaProvider::MyHeritage),
            "familytreedna" | "ftdna" => Ok(DnaProvider::FamilyTreeDna),
            "generic" => Ok(DnaProvider::Generic),
            other => Err(format!("Unknown DNA provider: {}", other)),
        }
    }
}

/// One genotype observation
///
/// Parsers produce raw markers (annotation fields `None`); the health marker
/// filter produces annotated copies with all three annotation fields set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticMarker {
    /// Reference SNP cluster id (e.g., "rs7412") or synthesized "chr1:1000"
    pub rsid: String,

    /// Chromosome label as written by the vendor ("1"-"22", "X", "Y", "MT")
    pub chromosome: String,

    /// Base pair position, 0 when the source value was not numeric
    pub position: u64,

    /// Allele pair as read (e.g., "TT", "AG")
    pub genotype: String,

    /// Allele associated with elevated risk
    pub risk_allele: Option<String>,

    /// Associated condition or effect label
    pub effect: Option<String>,

    /// Evidence confidence (0.0-1.0)
    pub confidence: Option<f64>,
}

impl GeneticMarker {
    /// Create an unannotated marker as read from a raw export
    pub fn raw(
        rsid: impl Into<String>,
        chromosome: impl Into<String>,
        position: u64,
        genotype: impl Into<String>,
    ) -> Self {
        Self {
            rsid: rsid.into(),
            chromosome: chromosome.into(),
            position,
            genotype: genotype.into(),
            risk_allele: None,
            effect: None,
            confidence: None,
        }
    }

    /// Return an annotated copy of this marker
    pub fn annotated(&self, risk_allele: &str, effect: &str, confidence: f64) -> Self {
        Self {
            risk_allele: Some(risk_allele.to_string()),
            effect: Some(effect.to_string()),
            confidence: Some(confidence),
            ..self.clone()
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.risk_allele.is_some() && self.effect.is_some() && self.confidence.is_some()
    }
}

/// Aggregate view over a filtered marker set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneticSummary {
    pub total_markers: usize,
    /// Distinct condition labels, sorted
    pub conditions_analyzed: Vec<String>,
    /// Markers with confidence above 0.8
    pub high_confidence_markers: usize,
    /// Distinct catalog genes, sorted
    pub genes_analyzed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip_through_serde() {
        let json = serde_json::to_string(&DnaProvider::TwentyThreeAndMe).unwrap();
        assert_eq!(json, "\"23andme\"");

        let parsed: DnaProvider = serde_json::from_str("\"ancestrydna\"").unwrap();
        assert_eq!(parsed, DnaProvider::AncestryDna);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("23andMe".parse::<DnaProvider>().unwrap(), DnaProvider::TwentyThreeAndMe);
        assert_eq!("MyHeritage".parse::<DnaProvider>().unwrap(), DnaProvider::MyHeritage);
        assert!("nebula".parse::<DnaProvider>().is_err());
    }

    #[test]
    fn test_annotated_copy_keeps_observation() {
        let raw = GeneticMarker::raw("rs7412", "19", 44908822, "CT");
        assert!(!raw.is_annotated());

        let annotated = raw.annotated("T", "Alzheimer's risk", 0.85);
        assert!(annotated.is_annotated());
        assert_eq!(annotated.rsid, raw.rsid);
        assert_eq!(annotated.genotype, "CT");
        assert_eq!(annotated.confidence, Some(0.85));

        // The source value is untouched
        assert!(raw.risk_allele.is_none());
    }
}
