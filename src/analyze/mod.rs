// src/analyze/mod.rs
//! Analysis stage: model request, response schema, and strict validation of the reply.

pub mod ai_adapter;
pub mod schema;
pub mod validator;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub use ai_adapter::{DynModelClient, GeminiClient, ModelClient};
pub use validator::{quality_issues, validate_response};

/// Name of the structured-output contract sent with every model request.
pub const ANALYSIS_SCHEMA_NAME: &str = "startup_idea_analysis_v1";

/// A fully validated analysis. Only built from a reply that passed the schema check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_metadata: AnalysisMetadata,
    pub market_assessment: MarketAssessment,
    pub competitive_landscape: CompetitiveLandscape,
    pub uniqueness_analysis: UniquenessAnalysis,
    pub business_viability: BusinessViability,
    pub risk_assessment: RiskAssessment,
    pub value_enhancement_roadmap: ValueEnhancementRoadmap,
    pub strategic_recommendations: StrategicRecommendations,
    /// Keys outside the schema, kept as the model sent them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// 0..1
    pub confidence_score: Number,
    pub analysis_depth: String,
    pub data_sources_used: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAssessment {
    /// 0..100
    pub overall_score: i64,
    pub verdict: String,
    pub market_saturation: String,
    pub entry_barriers: String,
    pub market_timing: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingSolution {
    pub name: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub market_position: String,
    pub customer_pain_points: Vec<String>,
    pub differentiation_gaps: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveLandscape {
    pub existing_solutions: Vec<ExistingSolution>,
    pub market_gaps: Vec<String>,
    pub competitive_advantages: Vec<String>,
    pub market_saturation_level: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniquenessAnalysis {
    /// 0..10
    pub novelty_score: Number,
    pub differentiation_factors: Vec<String>,
    pub copycat_risk: String,
    pub innovation_level: String,
    pub unique_value_proposition: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessViability {
    pub customer_value_proposition: String,
    pub target_market_size: String,
    pub monetization_potential: String,
    pub pricing_strategy: String,
    pub customer_acquisition_cost: String,
    pub unit_economics: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub market_risks: Vec<String>,
    pub execution_risks: Vec<String>,
    pub competitive_risks: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub risk_level: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEnhancementRoadmap {
    pub current_gaps: Vec<String>,
    pub differentiation_opportunities: Vec<String>,
    pub feature_prioritization: Vec<String>,
    pub market_positioning: Vec<String>,
    pub competitive_response_strategy: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicRecommendations {
    pub market_entry_strategy: String,
    pub pivot_suggestions: Vec<String>,
    pub success_factors: Vec<String>,
    pub next_steps: Vec<String>,
    pub timeline_recommendations: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Immutable input for one model call, built by the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub missing_signals: Vec<crate::signals::SignalKind>,
    pub schema_name: &'static str,
}
