use chrono::{Duration, NaiveDate};
use concierge_assist::mock_alternatives;
use concierge_core::airports::known_cities;
use concierge_core::search::{AirportInfo, FlightOption, FlightQuery};
use tracing::{debug, warn};

use crate::context::TripContext;

/// Alternatives offered for a change.
pub const MAX_ALTERNATIVES: usize = 3;

/// Schedule lookups: live provider through the cache, generated options when
/// the provider is missing, failing or has nothing for the route.
#[derive(Clone)]
pub struct FlightCatalog {
    ctx: TripContext,
}

impl FlightCatalog {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Up to three flights for a route and day. Never empty for a valid route.
    pub async fn alternatives(&self, origin: &str, destination: &str, date: NaiveDate) -> Vec<FlightOption> {
        for day in [date, date - Duration::days(1)] {
            let query = FlightQuery::route(origin, destination, day);
            if let Some(flights) = self.provider_flights(&query).await {
                if !flights.is_empty() {
                    return flights.into_iter().take(MAX_ALTERNATIVES).collect();
                }
            }
        }
        debug!(%origin, %destination, %date, "Using generated alternatives");
        mock_alternatives(origin, destination, date)
    }

    /// A day's schedule, optionally narrowed. Empty when no provider answers.
    pub async fn list(&self, query: &FlightQuery) -> Vec<FlightOption> {
        self.provider_flights(query).await.unwrap_or_default()
    }

    /// Resolves an option id or flight number against the alternatives for a day.
    pub async fn find_option(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        id_or_number: &str,
    ) -> Option<FlightOption> {
        self.alternatives(origin, destination, date)
            .await
            .into_iter()
            .find(|f| f.matches(id_or_number))
    }

    pub async fn airport(&self, code: &str) -> Option<AirportInfo> {
        if let Some(provider) = &self.ctx.vendors.flight_data {
            match provider.airport(code).await {
                Ok(Some(airport)) => return Some(airport),
                Ok(None) => {}
                Err(e) => warn!("Airport lookup failed, using built-in table: {}", e),
            }
        }
        AirportInfo::fallback(code)
    }

    pub async fn airports(&self) -> Vec<AirportInfo> {
        if let Some(provider) = &self.ctx.vendors.flight_data {
            match provider.airports().await {
                Ok(airports) if !airports.is_empty() => return airports,
                Ok(_) => {}
                Err(e) => warn!("Airport list failed, using built-in table: {}", e),
            }
        }
        let mut airports: Vec<AirportInfo> = known_cities()
            .filter_map(|(code, _)| AirportInfo::fallback(code))
            .collect();
        airports.sort_by(|a, b| a.code.cmp(&b.code));
        airports
    }

    /// None when there is no provider or it failed.
    async fn provider_flights(&self, query: &FlightQuery) -> Option<Vec<FlightOption>> {
        let provider = self.ctx.vendors.flight_data.as_ref()?;
        let key = query.cache_key();

        match self.ctx.cache.get(&key).await {
            Ok(Some(cached)) => {
                if let Ok(flights) = serde_json::from_str::<Vec<FlightOption>>(&cached) {
                    debug!(%key, "Flight cache hit");
                    return Some(flights);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Flight cache read failed: {}", e),
        }

        match provider.flights(query).await {
            Ok(flights) => {
                if let Ok(json) = serde_json::to_string(&flights) {
                    if let Err(e) = self.ctx.cache.set_ex(&key, &json, self.ctx.rules.flight_cache_seconds).await {
                        warn!("Flight cache write failed: {}", e);
                    }
                }
                Some(flights)
            }
            Err(e) => {
                warn!("Flight provider failed, falling back: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubFlights};
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn test_generated_alternatives_without_provider() {
        let catalog = FlightCatalog::new(context());
        let flights = catalog.alternatives("dfw", "ord", date()).await;
        assert_eq!(flights.len(), 3);
        assert_eq!(flights[0].id, "mock-DFW-ORD-1");
        assert_eq!(flights[0].gate, "TBD");
    }

    #[tokio::test]
    async fn test_provider_results_are_capped_and_cached() {
        let stub = Arc::new(StubFlights::with_flights(5));
        let mut ctx = context();
        ctx.vendors.flight_data = Some(stub.clone());
        let catalog = FlightCatalog::new(ctx);

        let first = catalog.alternatives("DFW", "ORD", date()).await;
        let second = catalog.alternatives("DFW", "ORD", date()).await;

        assert_eq!(first.len(), MAX_ALTERNATIVES);
        assert_eq!(first, second);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_day_retries_previous_day() {
        let stub = Arc::new(StubFlights::only_on(date() - Duration::days(1)));
        let mut ctx = context();
        ctx.vendors.flight_data = Some(stub.clone());
        let catalog = FlightCatalog::new(ctx);

        let flights = catalog.alternatives("DFW", "ORD", date()).await;
        assert!(flights.iter().all(|f| f.id.starts_with("stub-")));
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_airport_fallback_table() {
        let catalog = FlightCatalog::new(context());
        assert_eq!(catalog.airport("dfw").await.map(|a| a.city), Some("Dallas".to_string()));
        assert!(catalog.airport("ZZZ").await.is_none());
        assert!(catalog.airports().await.iter().any(|a| a.code == "MIA"));
    }
}
