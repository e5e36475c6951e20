use async_trait::async_trait;

use crate::llm::prompts::{AnalysisRequest, ENGINES};
use crate::llm::provider::AnalysisProvider;
use crate::models::analysis::{AnalysisResult, RawVerdict, SimulationEntry};

pub const MOCK_GEO_SCORE: u8 = 78;

/// Offline stand-in used when no engine credential is configured.
#[derive(Debug, Clone, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn sample_result(request: &AnalysisRequest) -> AnalysisResult {
        let signals = &request.signals;
        let subject = if signals.has_title() {
            signals.title.clone()
        } else {
            signals.url.clone()
        };

        AnalysisResult {
            geo_score: MOCK_GEO_SCORE,
            gap_analysis: concat!(
                "<ul>",
                "<li><strong>Missing structured data:</strong> No Schema.org markup describes the page's organization, products or FAQs.</li>",
                "<li><strong>Content depth:</strong> The copy is too brief to answer detailed conversational questions.</li>",
                "<li><strong>Keyword gaps:</strong> Long-tail, question-style phrasing is underrepresented in headings.</li>",
                "</ul>"
            )
            .to_string(),
            simulations: vec![
                SimulationEntry {
                    engine: ENGINES[0].to_string(),
                    query: format!("What is {}?", subject),
                    simulation_text: format!(
                        "{} appears as a supporting source, summarized from its headline and description.",
                        subject
                    ),
                    visibility_score: 85,
                },
                SimulationEntry {
                    engine: ENGINES[1].to_string(),
                    query: format!("Reviews for {}", signals.url),
                    simulation_text: format!(
                        "According to {}, the site offers an overview but few specifics an answer engine can quote.",
                        signals.url
                    ),
                    visibility_score: 72,
                },
                SimulationEntry {
                    engine: ENGINES[2].to_string(),
                    query: format!("Tell me about {}", subject),
                    simulation_text: format!(
                        "I found that {} covers the basics; more detailed pages would make it easier to cite.",
                        subject
                    ),
                    visibility_score: 90,
                },
            ],
            recommendations: vec![
                "Implement Schema.org structured data on key pages.".to_string(),
                "Create a comprehensive FAQ section that answers common natural-language questions.".to_string(),
                "Optimize for conversational, long-tail queries rather than only short-tail keywords.".to_string(),
            ],
        }
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    async fn analyze(&self, request: &AnalysisRequest) -> RawVerdict {
        tracing::info!("No analysis engine configured, returning mock verdict");
        RawVerdict::Structured(Self::sample_result(request))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
