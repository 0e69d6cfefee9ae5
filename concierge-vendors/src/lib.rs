pub mod elevenlabs;
pub mod flight_engine;
pub mod gemini;
mod http;
pub mod resend;
pub mod resiliency;
pub mod retell;

use std::sync::Arc;

use concierge_core::providers::{CallPlacer, FlightDataProvider, LanguageModel, Mailer, SpeechSynthesizer};
use concierge_store::app_config::Config;

pub use elevenlabs::ElevenLabsClient;
pub use flight_engine::FlightEngineClient;
pub use gemini::GeminiClient;
pub use resend::ResendClient;
pub use resiliency::{CircuitBreaker, CircuitState};
pub use retell::RetellClient;

/// Every third-party client the service can use. A missing entry means the
/// vendor is not configured and callers go straight to their fallback.
#[derive(Clone, Default)]
pub struct VendorSet {
    pub language_model: Option<Arc<dyn LanguageModel>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    pub flight_data: Option<Arc<dyn FlightDataProvider>>,
    /// Preferred reminder provider first.
    pub callers: Vec<Arc<dyn CallPlacer>>,
    pub mailer: Option<Arc<dyn Mailer>>,
}

impl VendorSet {
    /// No vendors at all: rules, templates and demo data only.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        let elevenlabs = ElevenLabsClient::from_config(&config.elevenlabs);
        let retell = RetellClient::from_config(&config.retell);

        let mut callers: Vec<Arc<dyn CallPlacer>> = Vec::new();
        if let Some(client) = elevenlabs.as_ref().filter(|c| c.can_place_calls()) {
            callers.push(client.clone());
        }
        if let Some(client) = retell {
            callers.push(client);
        }
        let preferred = config.business_rules.reminder_provider.to_lowercase();
        callers.sort_by_key(|c| c.name() != preferred);

        let vendors = Self {
            language_model: GeminiClient::from_config(&config.gemini)
                .map(|c| Arc::new(c) as Arc<dyn LanguageModel>),
            speech: elevenlabs.map(|c| c as Arc<dyn SpeechSynthesizer>),
            flight_data: FlightEngineClient::from_config(&config.flight_engine)
                .map(|c| c as Arc<dyn FlightDataProvider>),
            callers,
            mailer: ResendClient::from_config(&config.resend).map(|c| c as Arc<dyn Mailer>),
        };

        tracing::info!(
            llm = vendors.language_model.is_some(),
            tts = vendors.speech.is_some(),
            flight_data = vendors.flight_data.is_some(),
            callers = vendors.callers.len(),
            email = vendors.mailer.is_some(),
            "Vendor clients configured"
        );
        vendors
    }
}
