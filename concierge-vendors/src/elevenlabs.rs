use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::models::Language;
use concierge_core::providers::{CallPlacer, OutboundCall, ProviderError, ProviderResult, SpeechSynthesizer};
use concierge_store::app_config::ElevenLabsConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::http;
use crate::resiliency::CircuitBreaker;

const PROVIDER: &str = "elevenlabs";
const TTS_MODEL: &str = "eleven_turbo_v2_5";

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct OutboundCallRequest<'a> {
    agent_id: &'a str,
    phone_number: &'a str,
    first_message: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    dynamic_variables: &'a Value,
}

pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: String,
    voice_id_en: String,
    voice_id_es: String,
    /// Reminder agent first, then the general one.
    agent_id: Option<String>,
    base_url: String,
    breaker: CircuitBreaker,
}

impl ElevenLabsClient {
    pub fn from_config(config: &ElevenLabsConfig) -> Option<Arc<Self>> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        let agent_id = config
            .reminder_agent_id
            .clone()
            .or_else(|| config.agent_id.clone())
            .filter(|a| !a.is_empty());
        info!(calls_enabled = agent_id.is_some(), "Initialized ElevenLabs client");

        Some(Arc::new(Self {
            client: http::client(http::DEFAULT_TIMEOUT),
            api_key,
            voice_id_en: config.voice_id_en.clone(),
            voice_id_es: config.voice_id_es.clone(),
            agent_id,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::for_vendor(PROVIDER),
        }))
    }

    pub fn can_place_calls(&self) -> bool {
        self.agent_id.is_some()
    }

    fn voice_for(&self, language: Language) -> &str {
        if language.is_spanish() { &self.voice_id_es } else { &self.voice_id_en }
    }

    async fn text_to_speech(&self, text: &str, language: Language) -> ProviderResult<Vec<u8>> {
        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_for(language));
        let body = SpeechRequest {
            text,
            model_id: TTS_MODEL,
            voice_settings: VoiceSettings { stability: 0.7, similarity_boost: 0.8 },
        };

        debug!(%language, chars = text.len(), "Synthesizing speech");
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response).await?;
        let bytes = response.bytes().await.map_err(|e| http::transport(PROVIDER, e))?;
        Ok(bytes.to_vec())
    }

    async fn outbound_call(&self, agent_id: &str, call: &OutboundCall) -> ProviderResult<String> {
        let url = format!("{}/convai/twilio/outbound-call", self.base_url);
        let body = OutboundCallRequest {
            agent_id,
            phone_number: call.to_number.expose().as_str(),
            first_message: &call.first_message,
            dynamic_variables: &call.dynamic_variables,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response).await?;
        let payload: Value = http::json(PROVIDER, response).await?;
        info!(to = %call.to_number, "ElevenLabs outbound call initiated");
        Ok(call_id_from(&payload))
    }
}

fn call_id_from(payload: &Value) -> String {
    ["conversation_id", "callSid", "call_sid"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, language: Language) -> ProviderResult<Vec<u8>> {
        self.breaker.call(|| self.text_to_speech(text, language)).await
    }
}

#[async_trait]
impl CallPlacer for ElevenLabsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn place_call(&self, call: &OutboundCall) -> ProviderResult<String> {
        let agent_id = self
            .agent_id
            .as_deref()
            .ok_or(ProviderError::NotConfigured("ElevenLabs agent"))?;
        self.breaker.call(|| self.outbound_call(agent_id, call)).await
    }
}
