use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::airports::city_name;
use concierge_core::models::FlightStatus;
use concierge_core::providers::{FlightDataProvider, ProviderResult};
use concierge_core::search::{AirportInfo, FlightOption, FlightQuery};
use concierge_store::app_config::FlightEngineConfig;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::http;
use crate::resiliency::CircuitBreaker;

const PROVIDER: &str = "flight-engine";

#[derive(Debug, Deserialize, Default)]
struct RawPlace {
    #[serde(default)]
    code: String,
    #[serde(default)]
    city: String,
}

#[derive(Debug, Deserialize, Default)]
struct RawDuration {
    #[serde(default)]
    locale: String,
}

#[derive(Debug, Deserialize, Default)]
struct RawAircraft {
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlight {
    /// Sometimes a number, sometimes a string.
    flight_number: Value,
    #[serde(default)]
    origin: RawPlace,
    #[serde(default)]
    destination: RawPlace,
    departure_time: String,
    arrival_time: String,
    gate: Option<String>,
    #[serde(default)]
    duration: RawDuration,
    #[serde(default)]
    aircraft: RawAircraft,
    distance: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAirport {
    code: String,
    #[serde(default)]
    city: String,
    name: Option<String>,
    timezone: Option<String>,
    #[serde(default)]
    location: RawLocation,
}

impl RawFlight {
    fn into_option(self) -> Option<FlightOption> {
        let number = match &self.flight_number {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let departure_time = parse_time(&self.departure_time)?;
        let arrival_time = parse_time(&self.arrival_time)?;
        let origin = self.origin.code.to_uppercase();
        let destination = self.destination.code.to_uppercase();

        Some(FlightOption {
            id: format!("fe-{}", number),
            flight_number: format!("AA{}", number),
            origin_city: non_empty_or(self.origin.city, city_name(&origin)),
            destination_city: non_empty_or(self.destination.city, city_name(&destination)),
            origin,
            destination,
            departure_time,
            arrival_time,
            gate: self.gate.filter(|g| !g.is_empty()).unwrap_or_else(|| "TBD".to_string()),
            status: FlightStatus::Scheduled,
            duration: self.duration.locale,
            aircraft: Some(self.aircraft.model).filter(|m| !m.is_empty()),
            distance_miles: self.distance.map(|d| d.round() as u32),
        })
    }
}

impl From<RawAirport> for AirportInfo {
    fn from(raw: RawAirport) -> Self {
        let code = raw.code.to_uppercase();
        AirportInfo {
            city: non_empty_or(raw.city, city_name(&code)),
            code,
            name: raw.name,
            timezone: raw.timezone,
            latitude: raw.location.latitude,
            longitude: raw.location.longitude,
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() { fallback.to_string() } else { value }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

/// Client for the AA hackathon Flight-Engine mock schedule API.
pub struct FlightEngineClient {
    client: reqwest::Client,
    base_url: String,
    breaker: CircuitBreaker,
}

impl FlightEngineClient {
    pub fn from_config(config: &FlightEngineConfig) -> Option<Arc<Self>> {
        if !config.enabled {
            return None;
        }
        info!(base_url = %config.base_url, "Initialized Flight-Engine client");
        Some(Arc::new(Self {
            client: http::client(Duration::from_secs(config.timeout_seconds)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::for_vendor(PROVIDER),
        }))
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> ProviderResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "Flight-Engine request");
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| http::transport(PROVIDER, e))?;
        http::ensure_success(PROVIDER, response).await
    }

    async fn fetch_airport(&self, code: &str) -> ProviderResult<Option<AirportInfo>> {
        match self.get("/airports", &[("code", code.to_uppercase())]).await {
            Ok(response) => {
                let raw: Option<RawAirport> = http::json(PROVIDER, response).await?;
                Ok(raw.map(AirportInfo::from))
            }
            Err(concierge_core::providers::ProviderError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_airports(&self) -> ProviderResult<Vec<AirportInfo>> {
        let response = self.get("/airports/all", &[]).await?;
        let raw: Vec<RawAirport> = http::json(PROVIDER, response).await?;
        Ok(raw.into_iter().map(AirportInfo::from).collect())
    }

    async fn fetch_flights(&self, query: &FlightQuery) -> ProviderResult<Vec<FlightOption>> {
        let mut params = vec![("date", query.date.format("%Y-%m-%d").to_string())];
        if let Some(origin) = &query.origin {
            params.push(("origin", origin.to_uppercase()));
        }
        if let Some(destination) = &query.destination {
            params.push(("destination", destination.to_uppercase()));
        }
        if let Some(number) = query.bare_flight_number() {
            params.push(("flightNumber", number));
        }

        let response = self.get("/flights", &params).await?;
        let raw: Vec<RawFlight> = http::json(PROVIDER, response).await?;
        let total = raw.len();
        let flights: Vec<FlightOption> = raw.into_iter().filter_map(RawFlight::into_option).collect();
        if flights.len() < total {
            debug!(skipped = total - flights.len(), "Dropped malformed Flight-Engine records");
        }
        Ok(flights)
    }
}

#[async_trait]
impl FlightDataProvider for FlightEngineClient {
    async fn airport(&self, code: &str) -> ProviderResult<Option<AirportInfo>> {
        self.breaker.call(|| self.fetch_airport(code)).await
    }

    async fn airports(&self) -> ProviderResult<Vec<AirportInfo>> {
        self.breaker.call(|| self.fetch_airports()).await
    }

    async fn flights(&self, query: &FlightQuery) -> ProviderResult<Vec<FlightOption>> {
        self.breaker.call(|| self.fetch_flights(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAMPLE: &str = r#"[
        {
            "flightNumber": "2931",
            "origin": {"code": "DFW", "city": "Dallas-Fort Worth", "timezone": "America/Chicago"},
            "destination": {"code": "ORD", "city": "Chicago"},
            "distance": 801,
            "duration": {"locale": "2h 25m", "hours": 2, "minutes": 25},
            "departureTime": "2026-05-01T14:10:00.000-05:00",
            "arrivalTime": "2026-05-01T16:35:00.000-05:00",
            "aircraft": {"model": "738", "passengerCapacity": 160}
        },
        {
            "flightNumber": 77,
            "origin": {"code": "dfw", "city": ""},
            "destination": {"code": "ord", "city": ""},
            "departureTime": "2026-05-01T20:00:00Z",
            "arrivalTime": "2026-05-01T22:00:00Z",
            "gate": "C4"
        },
        {
            "flightNumber": "13",
            "departureTime": "not a time",
            "arrivalTime": "2026-05-01T22:00:00Z"
        }
    ]"#;

    #[test]
    fn test_maps_flight_engine_records() {
        let raw: Vec<RawFlight> = serde_json::from_str(SAMPLE).unwrap();
        let options: Vec<FlightOption> = raw.into_iter().filter_map(RawFlight::into_option).collect();

        assert_eq!(options.len(), 2);
        let first = &options[0];
        assert_eq!(first.id, "fe-2931");
        assert_eq!(first.flight_number, "AA2931");
        assert_eq!(first.gate, "TBD");
        assert_eq!(first.duration, "2h 25m");
        assert_eq!(first.aircraft.as_deref(), Some("738"));
        assert_eq!(first.distance_miles, Some(801));
        assert_eq!(first.departure_time.hour(), 19);

        let second = &options[1];
        assert_eq!(second.flight_number, "AA77");
        assert_eq!(second.origin, "DFW");
        assert_eq!(second.origin_city, "Dallas");
        assert_eq!(second.gate, "C4");
        assert_eq!(second.aircraft, None);
    }

    #[test]
    fn test_maps_airport() {
        let raw: RawAirport = serde_json::from_str(
            r#"{"code": "mia", "city": "Miami", "timezone": "America/New_York",
                "location": {"latitude": 25.79, "longitude": -80.29}}"#,
        )
        .unwrap();
        let airport = AirportInfo::from(raw);
        assert_eq!(airport.code, "MIA");
        assert_eq!(airport.latitude, Some(25.79));
    }

    #[test]
    fn test_disabled_by_config() {
        let config = FlightEngineConfig { enabled: false, ..Default::default() };
        assert!(FlightEngineClient::from_config(&config).is_none());
    }
}
