use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use concierge_core::models::Language;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::context::TripContext;
use crate::error::{TripError, TripResult};

const WORDS_PER_MINUTE: u64 = 150;
const MIN_DURATION_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechResult {
    pub audio_url: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub fallback: bool,
    /// Present on fallback so the client can use on-device speech.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Text to speech as inline `data:` URLs, cached by language and text hash.
#[derive(Clone)]
pub struct VoiceService {
    ctx: TripContext,
}

impl VoiceService {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    pub async fn synthesize(&self, text: &str, language: Language) -> TripResult<SpeechResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TripError::validation("text is required"));
        }

        Ok(match self.audio_url(text, language).await {
            Some(url) => SpeechResult {
                audio_url: Some(url),
                duration_ms: estimate_duration_ms(text),
                fallback: false,
                text: None,
            },
            None => SpeechResult {
                audio_url: None,
                duration_ms: estimate_duration_ms(text),
                fallback: true,
                text: Some(text.to_string()),
            },
        })
    }

    /// None when speech is unavailable; callers then send text only.
    pub async fn audio_url(&self, text: &str, language: Language) -> Option<String> {
        let speech = self.ctx.vendors.speech.as_ref()?;
        let key = cache_key(text, language);

        match self.ctx.cache.get(&key).await {
            Ok(Some(url)) => {
                debug!(%key, "TTS cache hit");
                return Some(url);
            }
            Ok(None) => {}
            Err(e) => warn!("TTS cache read failed: {}", e),
        }

        match speech.synthesize(text, language).await {
            Ok(audio) => {
                let url = format!("data:audio/mpeg;base64,{}", STANDARD.encode(audio));
                if let Err(e) = self.ctx.cache.set_ex(&key, &url, self.ctx.rules.tts_cache_seconds).await {
                    warn!("TTS cache write failed: {}", e);
                }
                Some(url)
            }
            Err(e) => {
                warn!("Speech synthesis failed, sending text only: {}", e);
                None
            }
        }
    }
}

fn cache_key(text: &str, language: Language) -> String {
    let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
    format!("tts:{}:{}", language, &digest[..12])
}

/// Reading time at a relaxed speaking pace.
pub fn estimate_duration_ms(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    (words * 60_000 / WORDS_PER_MINUTE).max(MIN_DURATION_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubSpeech};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fallback_without_speech_vendor() {
        let voice = VoiceService::new(context());
        let result = voice.synthesize("Your flight leaves at nine", Language::En).await.unwrap();
        assert!(result.fallback);
        assert_eq!(result.audio_url, None);
        assert_eq!(result.duration_ms, 2000);
        assert_eq!(result.text.as_deref(), Some("Your flight leaves at nine"));
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let voice = VoiceService::new(context());
        let err = voice.synthesize("   ", Language::En).await.unwrap_err();
        assert_eq!(err.to_string(), "text is required");
    }

    #[tokio::test]
    async fn test_audio_is_cached() {
        let speech = Arc::new(StubSpeech::default());
        let mut ctx = context();
        ctx.vendors.speech = Some(speech.clone());
        let voice = VoiceService::new(ctx);

        let first = voice.synthesize("Hola", Language::Es).await.unwrap();
        let second = voice.synthesize("Hola", Language::Es).await.unwrap();

        assert!(!first.fallback);
        assert_eq!(first.audio_url.as_deref(), Some("data:audio/mpeg;base64,SG9sYQ=="));
        assert_eq!(first, second);
        assert_eq!(speech.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_key_shape() {
        let key = cache_key("hello", Language::En);
        assert!(key.starts_with("tts:en:"));
        assert_eq!(key.len(), "tts:en:".len() + 12);
        assert_ne!(key, cache_key("hello", Language::Es));
    }

    #[test]
    fn test_duration_floor() {
        assert_eq!(estimate_duration_ms("Hi"), MIN_DURATION_MS);
        assert_eq!(estimate_duration_ms(&"word ".repeat(150)), 60_000);
    }
}
