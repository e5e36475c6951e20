use std::sync::Arc;

use crate::config::Config;
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::{normalize_url, HttpFetcher, PageFetcher};
use crate::error::Result;
use crate::llm::{parse_verdict, select_provider, AnalysisProvider, AnalysisRequest};
use crate::models::Verdict;
use crate::storage::Storage;

/// Fetch → extract → prompt → analyze → validate → persist, once per call.
pub struct GeoPipeline {
    fetcher: Arc<dyn PageFetcher>,
    provider: Arc<dyn AnalysisProvider>,
    storage: Storage,
}

impl GeoPipeline {
    pub fn new(
        fetcher: impl PageFetcher + 'static,
        provider: impl AnalysisProvider + 'static,
        storage: Storage,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            provider: Arc::new(provider),
            storage,
        }
    }

    pub fn from_config(config: &Config, storage: Storage) -> Result<Self> {
        let provider = select_provider(config.backend())?;
        tracing::info!("Using {} analysis engine", provider.name());

        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new()?),
            provider,
            storage,
        })
    }

    /// Analyze one page and persist the outcome. Returns the new analysis id.
    ///
    /// Fetch failures abort without saving anything. Engine or parsing failures do not:
    /// they are stored as a zero-score analysis whose narrative carries the error.
    pub async fn run_analysis(&self, url_input: &str) -> Result<i64> {
        let url = normalize_url(url_input)?;

        // Step 1: Fetch the page
        let html = self.fetcher.fetch(&url).await?;

        // Step 2: Extract signals
        let signals = extract(&html, &url);
        tracing::info!(
            "Extracted signals for {}: {} h1, {} h2, accessibility {}",
            url,
            signals.h1.len(),
            signals.h2.len(),
            signals.accessibility_score
        );
        let title = signals.title.clone();

        // Step 3: Build the request and ask the engine
        let request = AnalysisRequest::new(signals);
        let raw = self.provider.analyze(&request).await;

        // Step 4: Validate
        let verdict = parse_verdict(raw);
        if let Verdict::Degraded { reason } = &verdict {
            tracing::warn!("Analysis of {} degraded: {}", url, reason);
        }
        let result = verdict.into_result();

        // Step 5: Persist
        let analysis_id = self.storage.save_analysis(&url, &title, &result)?;
        tracing::info!(
            "Saved analysis {} for {} (GEO score {})",
            analysis_id,
            url,
            result.geo_score
        );

        Ok(analysis_id)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
