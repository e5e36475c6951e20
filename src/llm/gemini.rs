use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DEFAULT_GEMINI_MODEL;
use crate::error::{Error, Result};
use crate::llm::prompts::{AnalysisRequest, SYSTEM_PROMPT};
use crate::llm::provider::AnalysisProvider;
use crate::models::analysis::RawVerdict;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    #[serde(default)]
    status: Option<String>,
    message: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        tracing::debug!("Sending ~{} tokens to Gemini", request.estimate_tokens());

        let request_body = GenerateRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(SYSTEM_PROMPT.to_string()),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(request.prompt().to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.4,
                max_output_tokens: 8192,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::LLMApi("Gemini request timed out".to_string())
                } else {
                    Error::LLMApi(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to read Gemini response: {}", e)))?;

        let parsed: Option<GenerateResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.error)
                .map(|e| match e.status {
                    Some(s) => format!("{}: {}", s, e.message),
                    None => e.message,
                })
                .unwrap_or(body);
            return Err(Error::LLMApi(format!("Gemini API error ({}): {}", status, detail)));
        }

        let parsed = parsed.ok_or_else(|| {
            Error::LLMApi("Failed to parse Gemini response".to_string())
        })?;
        response_text(parsed)
    }
}

fn response_text(response: GenerateResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(Error::LLMApi(error.message));
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::LLMApi(format!("Prompt blocked by Gemini: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::LLMApi("Gemini returned no candidates".to_string()))?;

    let text = candidate
        .content
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(Error::LLMApi(format!(
            "Empty response from Gemini (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    async fn analyze(&self, request: &AnalysisRequest) -> RawVerdict {
        match self.generate(request).await {
            Ok(text) => RawVerdict::Text(text),
            Err(e) => {
                tracing::warn!("Gemini analysis failed: {}", e);
                RawVerdict::Failed(e.to_string())
            }
        }
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}
