pub mod fetcher;
pub mod extractor;

pub use fetcher::{normalize_url, HttpFetcher, PageFetcher};
pub use extractor::extract;
