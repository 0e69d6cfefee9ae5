use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Flight, FlightStatus};

/// Query for a day's flights, optionally narrowed by route or flight number.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FlightQuery {
    pub date: NaiveDate,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub flight_number: Option<String>,
}

impl FlightQuery {
    pub fn route(origin: &str, destination: &str, date: NaiveDate) -> Self {
        Self {
            date,
            origin: Some(origin.to_uppercase()),
            destination: Some(destination.to_uppercase()),
            flight_number: None,
        }
    }

    /// Flight numbers are matched without the carrier prefix ("AA1234" -> "1234").
    pub fn bare_flight_number(&self) -> Option<String> {
        self.flight_number.as_ref().map(|n| {
            let n = n.trim().to_uppercase();
            n.strip_prefix("AA").map(str::to_string).unwrap_or(n)
        })
    }

    /// Stable key for caching provider responses.
    pub fn cache_key(&self) -> String {
        format!(
            "flights:{}:{}:{}:{}",
            self.date,
            self.origin.as_deref().unwrap_or("*"),
            self.destination.as_deref().unwrap_or("*"),
            self.bare_flight_number().as_deref().unwrap_or("*"),
        )
    }
}

/// A bookable flight as offered to the passenger (alternatives, search results).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightOption {
    pub id: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub gate: String,
    pub status: FlightStatus,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<u32>,
    pub origin_city: String,
    pub destination_city: String,
}

impl FlightOption {
    /// Option ids repeat from day to day, so the stored flight is keyed by date too.
    pub fn to_flight(&self) -> Flight {
        Flight {
            id: format!("{}-{}", self.id, self.departure_time.format("%Y%m%d")),
            flight_number: self.flight_number.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            gate: Some(self.gate.clone()),
            status: self.status,
        }
    }

    pub fn matches(&self, id_or_number: &str) -> bool {
        self.id == id_or_number || self.flight_number.eq_ignore_ascii_case(id_or_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirportInfo {
    pub code: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl AirportInfo {
    /// Minimal record from the built-in city table, used when no provider answers.
    pub fn fallback(code: &str) -> Option<Self> {
        let code = code.trim().to_uppercase();
        let city = crate::airports::city_name(&code);
        if city == code {
            return None;
        }
        Some(Self {
            city: city.to_string(),
            code,
            name: None,
            timezone: None,
            latitude: None,
            longitude: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_query_deserialization() {
        let json = r#"
            {
                "date": "2026-12-25",
                "origin": "DFW",
                "destination": null,
                "flight_number": "AA1234"
            }
        "#;
        let query: FlightQuery = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(query.origin.as_deref(), Some("DFW"));
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2026, 12, 25).unwrap());
        assert_eq!(query.bare_flight_number().as_deref(), Some("1234"));
        assert_eq!(query.cache_key(), "flights:2026-12-25:DFW:*:1234");
    }

    #[test]
    fn test_airport_fallback() {
        let info = AirportInfo::fallback("mia").unwrap();
        assert_eq!(info.code, "MIA");
        assert_eq!(info.city, "Miami");
        assert!(AirportInfo::fallback("ZZZ").is_none());
    }
}
