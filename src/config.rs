use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub database_path: String,
    pub llm_timeout_secs: u64,
}

/// Which analysis engine the pipeline talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisBackend {
    Remote {
        api_key: String,
        model: String,
        timeout: Duration,
    },
    Mock,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = non_blank(env::var("GEMINI_API_KEY").ok());

        let gemini_model = non_blank(env::var("GEMINI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "geo_tool.db".to_string());

        let llm_timeout_secs = match env::var("LLM_TIMEOUT_SECS") {
            Ok(v) => v.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("LLM_TIMEOUT_SECS must be a whole number of seconds, got '{}'", v))
            })?,
            Err(_) => 60,
        };

        if llm_timeout_secs == 0 {
            return Err(Error::Config(
                "LLM_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            gemini_api_key,
            gemini_model,
            database_path,
            llm_timeout_secs,
        })
    }

    /// A missing credential selects the mock engine; it is not an error.
    pub fn backend(&self) -> AnalysisBackend {
        match non_blank(self.gemini_api_key.clone()) {
            Some(api_key) => AnalysisBackend::Remote {
                api_key,
                model: self.gemini_model.clone(),
                timeout: Duration::from_secs(self.llm_timeout_secs),
            },
            None => AnalysisBackend::Mock,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            database_path: "geo_tool.db".to_string(),
            llm_timeout_secs: 60,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_without_key_is_mock() {
        let config = Config::default();
        assert_eq!(config.backend(), AnalysisBackend::Mock);
    }

    #[test]
    fn test_blank_key_is_treated_as_absent() {
        let config = Config {
            gemini_api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.backend(), AnalysisBackend::Mock);
    }

    #[test]
    fn test_backend_with_key_is_remote() {
        let config = Config {
            gemini_api_key: Some("secret".to_string()),
            gemini_model: "gemini-test".to_string(),
            llm_timeout_secs: 15,
            ..Config::default()
        };
        assert_eq!(
            config.backend(),
            AnalysisBackend::Remote {
                api_key: "secret".to_string(),
                model: "gemini-test".to_string(),
                timeout: Duration::from_secs(15),
            }
        );
    }
}
