pub mod provider;
pub mod gemini;
pub mod mock;
pub mod prompts;
pub mod parser;

use std::sync::Arc;

use crate::config::AnalysisBackend;
use crate::error::Result;

pub use provider::AnalysisProvider;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use prompts::{AnalysisRequest, build_prompt};
pub use parser::{parse_response, parse_verdict};

pub fn select_provider(backend: AnalysisBackend) -> Result<Arc<dyn AnalysisProvider>> {
    match backend {
        AnalysisBackend::Remote {
            api_key,
            model,
            timeout,
        } => Ok(Arc::new(GeminiProvider::new(api_key, Some(model), timeout)?)),
        AnalysisBackend::Mock => Ok(Arc::new(MockProvider::new())),
    }
}
