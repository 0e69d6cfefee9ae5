use async_trait::async_trait;
use concierge_core::providers::{LanguageModel, ProviderError, ProviderResult};
use concierge_store::app_config::GeminiConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::http;
use crate::resiliency::CircuitBreaker;

const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    breaker: CircuitBreaker,
}

impl GeminiClient {
    /// `None` without an API key.
    pub fn from_config(config: &GeminiConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        info!(model = %config.model, "Initialized Gemini client");
        Some(Self {
            client: http::client(http::DEFAULT_TIMEOUT),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::for_vendor(PROVIDER),
        })
    }

    async fn request(&self, prompt: &str) -> ProviderResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: 0.4, max_output_tokens: 1024 },
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling Gemini");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response).await?;
        let parsed: GenerateResponse = http::json(PROVIDER, response).await?;
        parsed.first_text().ok_or(ProviderError::Decode {
            provider: PROVIDER,
            message: "response had no candidate text".to_string(),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        self.breaker.call(|| self.request(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_first_candidate_text() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"intent\":\"greeting\"}"}],"role":"model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.first_text().as_deref(), Some("{\"intent\":\"greeting\"}"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(empty.first_text(), None);
    }

    #[test]
    fn test_requires_api_key() {
        assert!(GeminiClient::from_config(&GeminiConfig::default()).is_none());

        let config = GeminiConfig { api_key: Some("k".to_string()), ..Default::default() };
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.model, "gemini-2.0-flash");
    }
}
