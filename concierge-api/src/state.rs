use std::sync::Arc;

use concierge_store::app_config::{Config, RateLimitConfig};
use concierge_trip::TripContext;

use crate::metrics::Metrics;

#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Agent console tokens. `None` leaves the console open.
    pub jwt_secret: Option<String>,
    /// Key for Retell webhook signatures. `None` skips verification.
    pub retell_api_key: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub trip: TripContext,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: Arc<Metrics>,
    pub service: &'static str,
}

impl AppState {
    pub fn new(trip: TripContext, config: &Config) -> Self {
        Self {
            trip,
            auth: AuthConfig {
                jwt_secret: config.auth.jwt_secret.clone().filter(|s| !s.is_empty()),
                retell_api_key: config.retell.api_key.clone().filter(|s| !s.is_empty()),
            },
            rate_limit: config.rate_limit.clone(),
            metrics: Arc::new(Metrics::new()),
            service: "AA Voice Concierge API",
        }
    }
}
