pub mod config;
pub mod error;
pub mod models;
pub mod crawler;
pub mod llm;
pub mod analysis;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{AnalysisBackend, Config};
pub use error::{Error, FetchError, Result};
pub use crawler::{HttpFetcher, PageFetcher};
pub use llm::{AnalysisProvider, GeminiProvider, MockProvider};
pub use analysis::GeoPipeline;
pub use storage::Storage;
