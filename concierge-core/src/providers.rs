//! Seams to third-party services. Every caller treats a provider error as
//! "use the fallback", never as a user-facing failure.

use async_trait::async_trait;
use concierge_shared::Masked;
use serde::Serialize;
use serde_json::Value;

use crate::models::Language;
use crate::search::{AirportInfo, FlightOption, FlightQuery};
use crate::CoreResult;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("{provider} request failed: {message}")]
    Transport { provider: &'static str, message: String },
    #[error("{provider} returned HTTP {status}: {body}")]
    Status { provider: &'static str, status: u16, body: String },
    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: &'static str, message: String },
    #[error("circuit [{0}] is open")]
    CircuitOpen(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Text generation (intent detection, summaries).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

/// Text to speech. Returns MPEG audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: Language) -> ProviderResult<Vec<u8>>;
}

/// Live flight and airport data.
#[async_trait]
pub trait FlightDataProvider: Send + Sync {
    async fn airport(&self, code: &str) -> ProviderResult<Option<AirportInfo>>;

    async fn airports(&self) -> ProviderResult<Vec<AirportInfo>>;

    async fn flights(&self, query: &FlightQuery) -> ProviderResult<Vec<FlightOption>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundCall {
    pub to_number: Masked<String>,
    pub first_message: String,
    pub language: Language,
    pub dynamic_variables: Value,
}

/// Outbound voice calls (reminders, running-late alerts).
#[async_trait]
pub trait CallPlacer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the vendor's call id.
    async fn place_call(&self, call: &OutboundCall) -> ProviderResult<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub to: Masked<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the vendor's message id.
    async fn send(&self, email: &OutboundEmail) -> ProviderResult<String>;
}

/// Small TTL key/value store: response caches, dedup markers, rate limits.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> CoreResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CoreResult<()>;

    /// Set only when absent. True when this call created the key.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CoreResult<bool>;

    /// Fixed-window counter. True while the count is within `limit`.
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> CoreResult<bool>;
}
