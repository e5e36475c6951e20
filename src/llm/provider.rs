use async_trait::async_trait;
use crate::llm::prompts::AnalysisRequest;
use crate::models::analysis::RawVerdict;

/// An engine that answers analysis requests. Implementations never return errors:
/// failures are reported as [`RawVerdict::Failed`].
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> RawVerdict;
    fn name(&self) -> &str;
}
