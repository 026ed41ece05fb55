// ==============================================================================
// insights.rs - Insight Generator
// ==============================================================================
// Description: Natural-language health insights for analyzed markers
// Author: Matt Barham
// Created: 2026-09-24
// Modified: 2026-10-06
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use marker_processor::GeneticMarker;

use crate::run::SubjectProfile;

/// Markers forwarded per request
pub const MAX_PROMPT_MARKERS: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = "You are a genetic counselor and health specialist. \
You analyze genetic data to provide personalized health insights based on established research. \
Focus on relevant markers, risk levels, actionable lifestyle recommendations and plain-language explanations. \
Always emphasize that genetic predisposition is not destiny and lifestyle choices matter. \
Reply with a single JSON object and no markdown.";

const RESPONSE_SCHEMA: &str = r#"{
  "risk_assessments": [
    {
      "condition": "string",
      "risk_level": "low|moderate|high",
      "confidence_score": 0-100,
      "genetic_factors": ["rsid1", "rsid2"],
      "recommendations": ["rec1", "rec2"]
    }
  ],
  "nutrition_insights": {
    "genetic_factors": ["factor1"],
    "recommendations": ["rec1"],
    "foods_to_emphasize": ["food1"],
    "foods_to_limit": ["food1"]
  },
  "fitness_insights": {
    "genetic_factors": ["factor1"],
    "optimal_exercise_types": ["type1"],
    "recovery_recommendations": ["rec1"]
  },
  "mental_wellness": {
    "stress_response_profile": "string",
    "sleep_optimization": ["tip1"],
    "cognitive_enhancement": ["tip1"]
  }
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub condition: String,
    pub risk_level: RiskTier,
    /// 0-100
    pub confidence_score: f64,
    #[serde(default)]
    pub genetic_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionInsights {
    pub genetic_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub foods_to_emphasize: Vec<String>,
    pub foods_to_limit: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessInsights {
    pub genetic_factors: Vec<String>,
    pub optimal_exercise_types: Vec<String>,
    pub recovery_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentalWellness {
    pub stress_response_profile: String,
    pub sleep_optimization: Vec<String>,
    pub cognitive_enhancement: Vec<String>,
}

/// Insight bundle stored on an analyzed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightBundle {
    pub risk_assessments: Vec<RiskAssessment>,
    pub nutrition_insights: NutritionInsights,
    pub fitness_insights: FitnessInsights,
    pub mental_wellness: MentalWellness,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl InsightBundle {
    /// Fixed bundle substituted whenever the generator fails
    pub fn fallback() -> Self {
        Self {
            risk_assessments: vec![RiskAssessment {
                condition: "Cardiovascular Health".to_string(),
                risk_level: RiskTier::Moderate,
                confidence_score: 75.0,
                genetic_factors: strings(&["APOE", "MTHFR"]),
                recommendations: strings(&[
                    "Regular cardio exercise",
                    "Mediterranean diet",
                    "Omega-3 supplements",
                ]),
            }],
            nutrition_insights: NutritionInsights {
                genetic_factors: strings(&["MTHFR variant", "Lactase persistence"]),
                recommendations: strings(&["Folate-rich foods", "Limit processed foods"]),
                foods_to_emphasize: strings(&["Leafy greens", "Fish", "Nuts"]),
                foods_to_limit: strings(&["Processed sugar", "Trans fats"]),
            },
            fitness_insights: FitnessInsights {
                genetic_factors: strings(&["ACTN3", "ACE"]),
                optimal_exercise_types: strings(&["Mixed cardio/strength", "HIIT training"]),
                recovery_recommendations: strings(&["7-9 hours sleep", "Active recovery days"]),
            },
            mental_wellness: MentalWellness {
                stress_response_profile: "Moderate stress sensitivity".to_string(),
                sleep_optimization: strings(&["Cool room temperature", "Consistent schedule"]),
                cognitive_enhancement: strings(&["Meditation", "Brain training games"]),
            },
        }
    }

    fn validate(&self) -> Result<(), InsightError> {
        for assessment in &self.risk_assessments {
            if !(0.0..=100.0).contains(&assessment.confidence_score) {
                return Err(InsightError::ConfidenceOutOfRange {
                    condition: assessment.condition.clone(),
                    score: assessment.confidence_score,
                });
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Insight request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Insight service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Insight service reply had no message content")]
    MissingContent,

    #[error("Insight reply is not a valid bundle: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Confidence {score} for '{condition}' is outside 0-100")]
    ConfidenceOutOfRange { condition: String, score: f64 },
}

/// Insight generator collaborator
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(
        &self,
        markers: &[GeneticMarker],
        profile: &SubjectProfile,
    ) -> Result<InsightBundle, InsightError>;
}

/// Generator used when no insight service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackInsightGenerator;

#[async_trait]
impl InsightGenerator for FallbackInsightGenerator {
    async fn generate(
        &self,
        _markers: &[GeneticMarker],
        _profile: &SubjectProfile,
    ) -> Result<InsightBundle, InsightError> {
        Ok(InsightBundle::fallback())
    }
}

/// Chat-completions style HTTP insight service
pub struct HttpInsightGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpInsightGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl InsightGenerator for HttpInsightGenerator {
    async fn generate(
        &self,
        markers: &[GeneticMarker],
        profile: &SubjectProfile,
    ) -> Result<InsightBundle, InsightError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(markers, profile) },
            ],
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InsightError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bundle = parse_reply(&body)?;
        info!(
            "Generated insights for {} markers ({} risk assessments)",
            markers.len().min(MAX_PROMPT_MARKERS),
            bundle.risk_assessments.len()
        );
        Ok(bundle)
    }
}

/// User prompt: profile plus the first `MAX_PROMPT_MARKERS` markers
pub fn build_prompt(markers: &[GeneticMarker], profile: &SubjectProfile) -> String {
    let analyzed: Vec<Value> = markers
        .iter()
        .take(MAX_PROMPT_MARKERS)
        .map(|m| json!({ "rsid": m.rsid, "genotype": m.genotype, "effect": m.effect }))
        .collect();

    let genetic_data = json!({
        "total_markers": markers.len(),
        "analyzed_markers": analyzed,
        "user_demographics": profile,
    });
    let genetic_data = serde_json::to_string_pretty(&genetic_data).unwrap_or_default();

    format!(
        "Analyze the following genetic profile for personalized health insights.\n\n\
         Genetic Data: {}\n\n\
         Provide risk assessments for major health conditions (cardiovascular, diabetes, alzheimer's, cancer), \
         nutritional recommendations, exercise and fitness suggestions, mental health and cognitive insights, \
         and disease prevention strategies.\n\n\
         Format the response as a JSON object with the structure:\n{}",
        genetic_data, RESPONSE_SCHEMA
    )
}

/// Parse a chat-completions reply body into a bundle
pub fn parse_reply(body: &str) -> Result<InsightBundle, InsightError> {
    let reply: Value = serde_json::from_str(body)?;
    let content = reply
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or(InsightError::MissingContent)?;

    let content = strip_code_fence(content);
    debug!("Insight reply content: {} bytes", content.len());

    let bundle: InsightBundle = serde_json::from_str(content)?;
    bundle.validate()?;
    Ok(bundle)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_with(content: &str) -> String {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] }).to_string()
    }

    #[test]
    fn test_parse_reply() {
        let bundle_json = serde_json::to_string(&InsightBundle::fallback()).unwrap();
        let bundle = parse_reply(&reply_with(&bundle_json)).unwrap();
        assert_eq!(bundle, InsightBundle::fallback());
    }

    #[test]
    fn test_parse_fenced_reply() {
        let content = "```json\n{\"risk_assessments\": [], \"nutrition_insights\": {}, \
                       \"fitness_insights\": {}, \"mental_wellness\": {}}\n```";
        let bundle = parse_reply(&reply_with(content)).unwrap();
        assert!(bundle.risk_assessments.is_empty());
    }

    #[test]
    fn test_malformed_replies() {
        assert!(matches!(parse_reply("not json"), Err(InsightError::Malformed(_))));
        assert!(matches!(parse_reply("{\"choices\": []}"), Err(InsightError::MissingContent)));
        assert!(matches!(
            parse_reply(&reply_with("I cannot help with that")),
            Err(InsightError::Malformed(_))
        ));

        let out_of_range = "{\"risk_assessments\": [{\"condition\": \"Diabetes\", \"risk_level\": \"high\", \
                            \"confidence_score\": 140}], \"nutrition_insights\": {}, \
                            \"fitness_insights\": {}, \"mental_wellness\": {}}";
        assert!(matches!(
            parse_reply(&reply_with(out_of_range)),
            Err(InsightError::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_prompt_limits_markers() {
        let markers: Vec<GeneticMarker> = (0..60)
            .map(|i| GeneticMarker::raw(format!("rs{}", i), "1", i as u64, "AA"))
            .collect();
        let prompt = build_prompt(&markers, &SubjectProfile::default());

        assert!(prompt.contains("\"total_markers\": 60"));
        assert!(prompt.contains("\"rs49\""));
        assert!(!prompt.contains("\"rs50\""));
    }

    #[tokio::test]
    async fn test_fallback_generator() {
        let bundle = FallbackInsightGenerator
            .generate(&[], &SubjectProfile::default())
            .await
            .unwrap();
        assert_eq!(bundle.risk_assessments[0].risk_level, RiskTier::Moderate);
    }
}
