use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
    #[serde(default)]
    pub retell: RetellConfig,
    #[serde(default)]
    pub resend: ResendConfig,
    #[serde(default)]
    pub flight_engine: FlightEngineConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_session_expiry")]
    pub session_expiry_minutes: i64,
    #[serde(default = "default_call_session_expiry")]
    pub call_session_expiry_minutes: i64,
    /// Public URL prefix for helper links, e.g. `https://concierge.example.com/helper`
    pub helper_link_base_url: Option<String>,
    #[serde(default = "default_running_late_cooldown")]
    pub running_late_cooldown_minutes: i64,
    #[serde(default = "default_urgent_cooldown")]
    pub urgent_cooldown_minutes: i64,
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_seconds: u64,
    /// `elevenlabs` or `retell`; the other one is the fallback.
    #[serde(default = "default_reminder_provider")]
    pub reminder_provider: String,
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
    #[serde(default = "default_tts_cache")]
    pub tts_cache_seconds: u64,
    #[serde(default = "default_flight_cache")]
    pub flight_cache_seconds: u64,
}

fn default_session_expiry() -> i64 { 30 }
fn default_call_session_expiry() -> i64 { 60 }
fn default_running_late_cooldown() -> i64 { 10 }
fn default_urgent_cooldown() -> i64 { 5 }
fn default_reminder_interval() -> u64 { 60 }
fn default_reminder_provider() -> String { "elevenlabs".to_string() }
fn default_true() -> bool { true }
fn default_tts_cache() -> u64 { 15 * 60 }
fn default_flight_cache() -> u64 { 5 * 60 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            session_expiry_minutes: default_session_expiry(),
            call_session_expiry_minutes: default_call_session_expiry(),
            helper_link_base_url: None,
            running_late_cooldown_minutes: default_running_late_cooldown(),
            urgent_cooldown_minutes: default_urgent_cooldown(),
            reminder_interval_seconds: default_reminder_interval(),
            reminder_provider: default_reminder_provider(),
            seed_demo_data: true,
            tts_cache_seconds: default_tts_cache(),
            flight_cache_seconds: default_flight_cache(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// When unset the agent console is open.
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Absent means the in-memory store.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: default_max_connections() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Absent means the in-memory cache.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit")]
    pub requests_per_window: i64,
    #[serde(default = "default_rate_window")]
    pub window_seconds: i64,
}

fn default_rate_limit() -> i64 { 100 }
fn default_rate_window() -> i64 { 60 }

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_window: default_rate_limit(), window_seconds: default_rate_window() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String { "gemini-2.0-flash".to_string() }
fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }

impl Default for GeminiConfig {
    fn default() -> Self {
        Self { api_key: None, model: default_gemini_model(), base_url: default_gemini_url() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_voice_en")]
    pub voice_id_en: String,
    #[serde(default = "default_voice_es")]
    pub voice_id_es: String,
    /// Conversational agent used for outbound calls.
    pub agent_id: Option<String>,
    pub reminder_agent_id: Option<String>,
    #[serde(default = "default_elevenlabs_url")]
    pub base_url: String,
}

fn default_voice_en() -> String { "21m00Tcm4TlvDq8ikWAM".to_string() }
fn default_voice_es() -> String { "EXAVITQu4vr4xnSDxMaL".to_string() }
fn default_elevenlabs_url() -> String { "https://api.elevenlabs.io/v1".to_string() }

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id_en: default_voice_en(),
            voice_id_es: default_voice_es(),
            agent_id: None,
            reminder_agent_id: None,
            base_url: default_elevenlabs_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetellConfig {
    /// Also the HMAC key for webhook signatures.
    pub api_key: Option<String>,
    pub agent_id: Option<String>,
    pub from_number: Option<String>,
    #[serde(default = "default_retell_url")]
    pub base_url: String,
}

fn default_retell_url() -> String { "https://api.retellai.com".to_string() }

impl Default for RetellConfig {
    fn default() -> Self {
        Self { api_key: None, agent_id: None, from_number: None, base_url: default_retell_url() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResendConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_resend_url")]
    pub base_url: String,
}

fn default_from_email() -> String { "AA Voice Concierge <noreply@yourdomain.com>".to_string() }
fn default_resend_url() -> String { "https://api.resend.com".to_string() }

impl Default for ResendConfig {
    fn default() -> Self {
        Self { api_key: None, from_email: default_from_email(), base_url: default_resend_url() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FlightEngineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_flight_engine_url")]
    pub base_url: String,
    #[serde(default = "default_flight_engine_timeout")]
    pub timeout_seconds: u64,
}

fn default_flight_engine_url() -> String { "https://flight-engine-api.onrender.com".to_string() }
fn default_flight_engine_timeout() -> u64 { 10 }

impl Default for FlightEngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_flight_engine_url(),
            timeout_seconds: default_flight_engine_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `CONCIERGE__GEMINI__API_KEY=...`
            .add_source(config::Environment::with_prefix("CONCIERGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let raw = r#"
            [server]
            port = 9001

            [business_rules]
            session_expiry_minutes = 45
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.business_rules.session_expiry_minutes, 45);
        assert_eq!(config.business_rules.urgent_cooldown_minutes, 5);
        assert!(config.database.url.is_none());
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.rate_limit.requests_per_window, 100);
    }
}
