use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub geo_score: u8,
    pub created_at: DateTime<Utc>,
    pub gap_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: i64,
    pub analysis_id: i64,
    pub engine: String,
    pub query: String,
    pub simulation_text: String,
    pub visibility_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub analysis_id: i64,
    pub text: String,
}

/// An analysis with its child rows, loaded by explicit queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis: Analysis,
    pub simulations: Vec<Simulation>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTotals {
    pub analyses: u64,
    pub simulations: u64,
    pub recommendations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_scans: u64,
    pub average_score: f64,
    pub totals: StoreTotals,
    pub recent: Vec<Analysis>,
}
