use thiserror::Error;

/// Why a page could not be retrieved. Surfaced to the caller; nothing is saved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to fetch page: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Analysis not found: {0}")]
    AnalysisNotFound(i64),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the page could not be fetched, i.e. the run aborted before analysis.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::InvalidUrl(_))
    }
}
