use serde::{Deserialize, Serialize};

/// Serde names match the JSON object the analysis engine is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationEntry {
    pub engine: String,
    pub query: String,
    #[serde(rename = "simulation")]
    pub simulation_text: String,
    #[serde(rename = "score")]
    pub visibility_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub geo_score: u8,
    pub gap_analysis: String,
    #[serde(rename = "search_engine_simulation")]
    pub simulations: Vec<SimulationEntry>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Schema-valid placeholder stored when the engine could not produce a usable answer.
    pub fn degraded(reason: &str) -> Self {
        Self {
            geo_score: 0,
            gap_analysis: format!("Error generating analysis: {}", reason),
            simulations: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// What an analysis engine hands back before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawVerdict {
    Text(String),
    Structured(AnalysisResult),
    Failed(String),
}

/// Validated outcome of one analysis attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Complete(AnalysisResult),
    Degraded { reason: String },
}

impl Verdict {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Verdict::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Verdict::Degraded { .. })
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            Verdict::Complete(result) => result,
            Verdict::Degraded { reason } => AnalysisResult::degraded(&reason),
        }
    }
}
