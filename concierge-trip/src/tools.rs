//! Server-side tools the phone agents call mid-conversation. Results are
//! loose JSON because the agent reads them back verbatim.

use chrono::{Duration, NaiveDate, Timelike, Utc};
use concierge_assist::{generate_confirmation_code, parse_date_phrase, voice_agent_prompt};
use concierge_core::airports::{city_name, code_for_city};
use concierge_core::models::{
    FlightSegment, Language, Passenger, Reservation, ReservationStatus,
};
use concierge_core::search::{FlightOption, FlightQuery};
use concierge_shared::Masked;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::TripResult;
use crate::flights::{FlightCatalog, MAX_ALTERNATIVES};
use crate::format::{clock, month_day};
use crate::notify::Notifier;
use crate::reservations::ReservationService;

/// Tools a hosted voice agent may call.
pub const TOOL_NAMES: [&str; 5] = [
    "lookup_reservation",
    "change_flight",
    "create_booking",
    "get_flight_options",
    "get_reservation_status",
];

const SEARCH_LIMIT: usize = 5;
const FARE: &str = "$249";

#[derive(Clone)]
pub struct VoiceTools {
    ctx: TripContext,
}

impl VoiceTools {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Runs a tool by name. `None` for an unknown tool.
    pub async fn call(&self, name: &str, args: &Value) -> TripResult<Option<Value>> {
        info!(tool = %name, "Voice tool call");
        let result = match name {
            "lookup_reservation" => self.lookup_reservation(args).await?,
            "change_flight" => self.change_flight(args).await?,
            "create_booking" => self.create_booking(args).await?,
            "get_flight_options" => self.get_flight_options(args).await,
            "get_reservation_status" => self.get_reservation_status(args).await?,
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    /// System prompt to configure the hosted voice agent with.
    pub fn agent_prompt() -> String {
        voice_agent_prompt(&TOOL_NAMES)
    }

    /// Envelope the ElevenLabs agent expects around a tool result.
    pub async fn handle_server_tool(&self, tool_name: &str, parameters: &Value) -> TripResult<Value> {
        Ok(match self.call(tool_name, parameters).await? {
            Some(result) => json!({ "success": true, "tool_name": tool_name, "result": result }),
            None => json!({ "success": false, "error": format!("Unknown tool: {}", tool_name) }),
        })
    }

    async fn lookup_reservation(&self, args: &Value) -> TripResult<Value> {
        let code = code_arg(args);
        if code.is_empty() {
            return Ok(json!({ "success": false, "error": "No confirmation code provided" }));
        }
        let Some(reservation) = ReservationService::new(self.ctx.clone()).find_by_code(&code).await? else {
            return Ok(json!({
                "success": true,
                "found": false,
                "error": format!("No reservation found with code {}", code),
            }));
        };

        let passenger_name = reservation.passenger.full_name();
        let Some(segment) = reservation.first_segment() else {
            return Ok(json!({
                "success": true,
                "found": true,
                "confirmation_code": code,
                "passenger_name": passenger_name,
                "message": "Reservation found but no flight details available",
            }));
        };
        let flight = &segment.flight;
        Ok(json!({
            "success": true,
            "found": true,
            "confirmation_code": code,
            "passenger_name": passenger_name,
            "origin": flight.origin,
            "origin_city": flight.origin_city(),
            "destination": flight.destination,
            "destination_city": flight.destination_city(),
            "departure_date": month_day(flight.departure_time),
            "departure_time": clock(flight.departure_time),
            "flight_number": flight.flight_number,
            "seat": segment.seat.as_deref().unwrap_or("Not assigned"),
            "status": reservation.status,
        }))
    }

    async fn change_flight(&self, args: &Value) -> TripResult<Value> {
        let code = code_arg(args);
        if code.is_empty() {
            return Ok(json!({ "success": false, "error": "No confirmation code provided" }));
        }
        let reservations = ReservationService::new(self.ctx.clone());
        let Some(reservation) = reservations.find_by_code(&code).await? else {
            return Ok(json!({ "success": false, "error": format!("Reservation {} not found", code) }));
        };
        let Some(current) = reservation.first_flight().cloned() else {
            return Ok(json!({ "success": false, "error": "No flight found in reservation" }));
        };

        let date = date_arg(args, "new_date");
        let alternatives = FlightCatalog::new(self.ctx.clone())
            .alternatives(&current.origin, &current.destination, date)
            .await;
        if alternatives.is_empty() {
            return Ok(json!({
                "success": false,
                "error": format!("No flights available on {}", spoken_date(date)),
            }));
        }

        if let Some(selected_id) = text_arg(args, "selected_flight_id") {
            if let Some(selected) = alternatives.iter().find(|f| f.matches(&selected_id)) {
                let change = reservations.apply_option(reservation, selected).await?;
                Notifier::new(self.ctx.clone())
                    .change_confirmation(&change.reservation, &change.original, &change.new)
                    .await;
                return Ok(json!({
                    "success": true,
                    "changed": true,
                    "message": "Flight successfully changed",
                    "new_flight": {
                        "flight_number": selected.flight_number,
                        "departure_date": month_day(selected.departure_time),
                        "departure_time": clock(selected.departure_time),
                        "origin": selected.origin,
                        "destination": selected.destination,
                    },
                    "confirmation_code": code,
                }));
            }
        }

        let preferred = text_arg(args, "preferred_time").unwrap_or_default();
        let options: Vec<Value> = by_time_of_day(&alternatives, &preferred)
            .into_iter()
            .take(MAX_ALTERNATIVES)
            .map(|f| {
                json!({
                    "id": f.id,
                    "flight_number": f.flight_number,
                    "departure_time": clock(f.departure_time),
                    "departure_date": month_day(f.departure_time),
                    "price": "Same price",
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "changed": false,
            "options_available": true,
            "message": format!("Found {} flights on {}", options.len(), spoken_date(date)),
            "options": options,
        }))
    }

    async fn create_booking(&self, args: &Value) -> TripResult<Value> {
        let origin = airport_arg(args, "origin");
        let destination = airport_arg(args, "destination");
        let date_text = text_arg(args, "date").unwrap_or_default();

        let missing: Vec<&str> = [("origin", origin.is_empty()), ("destination", destination.is_empty()), ("date", date_text.is_empty())]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(field, _)| field)
            .collect();
        if !missing.is_empty() {
            return Ok(json!({
                "success": false,
                "error": format!("Missing required fields: {}", missing.join(", ")),
                "needs": missing,
            }));
        }

        let date = date_arg(args, "date");
        let flights = FlightCatalog::new(self.ctx.clone()).alternatives(&origin, &destination, date).await;
        if flights.is_empty() {
            return Ok(json!({
                "success": false,
                "error": format!(
                    "No flights found from {} to {} on {}",
                    city_name(&origin),
                    city_name(&destination),
                    spoken_date(date)
                ),
            }));
        }

        let first_name = text_arg(args, "first_name");
        let last_name = text_arg(args, "last_name");
        let selected_id = text_arg(args, "selected_flight_id");

        if let (Some(selected_id), Some(first), Some(last)) = (&selected_id, &first_name, &last_name) {
            let selected = flights.iter().find(|f| f.matches(selected_id)).unwrap_or(&flights[0]);
            let email = text_arg(args, "email");
            let phone = text_arg(args, "phone");
            let reservation = self.book(selected, first, last, email.as_deref(), phone.as_deref()).await?;
            let code = reservation.confirmation_code.clone();

            if email.is_some() {
                Notifier::new(self.ctx.clone()).booking_confirmation(&reservation).await;
            }

            return Ok(json!({
                "success": true,
                "booked": true,
                "confirmation_code": code,
                "passenger_name": format!("{} {}", first, last),
                "flight_number": selected.flight_number,
                "origin": selected.origin,
                "origin_city": city_name(&selected.origin),
                "destination": selected.destination,
                "destination_city": city_name(&selected.destination),
                "departure_date": selected.departure_time.format("%B %d, %Y").to_string(),
                "departure_time": clock(selected.departure_time),
                "message": format!("Booking confirmed! Your confirmation code is {}", code),
            }));
        }

        let options: Vec<Value> = flights
            .iter()
            .take(MAX_ALTERNATIVES)
            .map(|f| {
                json!({
                    "id": f.id,
                    "flight_number": f.flight_number,
                    "departure_time": clock(f.departure_time),
                    "price": FARE,
                })
            })
            .collect();
        let needs: Vec<&str> = if first_name.is_some() && last_name.is_some() {
            vec!["selected_flight_id"]
        } else {
            vec!["selected_flight_id", "first_name", "last_name"]
        };

        Ok(json!({
            "success": true,
            "booked": false,
            "message": format!(
                "Found {} flights. The earliest is at {} for {}.",
                options.len(),
                clock(flights[0].departure_time),
                FARE
            ),
            "options": options,
            "needs": needs,
        }))
    }

    async fn get_flight_options(&self, args: &Value) -> Value {
        let origin = airport_arg(args, "origin");
        let destination = airport_arg(args, "destination");
        let date = date_arg(args, "date");

        let catalog = FlightCatalog::new(self.ctx.clone());
        let mut flights = catalog.list(&FlightQuery::route(&origin, &destination, date)).await;
        if flights.is_empty() && !origin.is_empty() && !destination.is_empty() {
            flights = catalog.alternatives(&origin, &destination, date).await;
        }

        if flights.is_empty() {
            return json!({
                "success": true,
                "found": false,
                "message": format!("No flights available from {} to {} on {}", origin, destination, spoken_date(date)),
            });
        }

        let options: Vec<Value> = flights
            .iter()
            .take(SEARCH_LIMIT)
            .map(|f| {
                json!({
                    "id": f.id,
                    "flight_number": f.flight_number,
                    "departure_time": clock(f.departure_time),
                    "arrival_time": clock(f.arrival_time),
                    "price": FARE,
                })
            })
            .collect();
        json!({
            "success": true,
            "found": true,
            "count": options.len(),
            "options": options,
            "date": spoken_date(date),
        })
    }

    async fn get_reservation_status(&self, args: &Value) -> TripResult<Value> {
        let mut result = self.lookup_reservation(args).await?;
        if result["found"] == json!(true) && result.get("departure_date").is_some() {
            let message = if result["status"] == json!(ReservationStatus::Cancelled) {
                format!("Your reservation {} has been cancelled", result["confirmation_code"].as_str().unwrap_or_default())
            } else {
                format!(
                    "Your flight is confirmed for {} at {}",
                    result["departure_date"].as_str().unwrap_or_default(),
                    result["departure_time"].as_str().unwrap_or_default()
                )
            };
            result["message"] = json!(message);
        }
        Ok(result)
    }

    /// Stores a new single-segment reservation under a fresh confirmation code.
    async fn book(
        &self,
        option: &FlightOption,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> TripResult<Reservation> {
        let mut code = generate_confirmation_code();
        while self.ctx.store.find_by_code(&code).await?.is_some() {
            code = generate_confirmation_code();
        }

        let now = Utc::now();
        let flight = option.to_flight();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            confirmation_code: code,
            passenger: Passenger {
                id: Uuid::new_v4(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: Masked::from(email.unwrap_or_default().to_string()),
                phone: phone.map(|p| Masked::from(p.to_string())),
                aadvantage_number: None,
                language: Language::En,
                seat_preference: None,
            },
            segments: vec![FlightSegment { id: Uuid::new_v4(), flight, seat: None, segment_order: 1 }],
            status: ReservationStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        self.ctx.store.save_flight(&reservation.segments[0].flight).await?;
        self.ctx.store.save_reservation(&reservation).await?;
        info!(code = %reservation.confirmation_code, flight = %option.flight_number, "Booking created by phone agent");
        Ok(reservation)
    }
}

fn text_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn code_arg(args: &Value) -> String {
    text_arg(args, "confirmation_code").unwrap_or_default().to_uppercase()
}

/// A city name or code as an IATA code. Unknown names pass through upper-cased.
fn airport_arg(args: &Value, key: &str) -> String {
    let raw = text_arg(args, key).unwrap_or_default();
    code_for_city(&raw).map(str::to_string).unwrap_or_else(|| raw.to_uppercase())
}

/// Spoken date phrase, tomorrow when absent or not understood.
fn date_arg(args: &Value, key: &str) -> NaiveDate {
    let today = Utc::now().date_naive();
    text_arg(args, key)
        .and_then(|phrase| parse_date_phrase(&phrase, today))
        .unwrap_or(today + Duration::days(1))
}

fn spoken_date(date: NaiveDate) -> String {
    date.format("%B %d").to_string()
}

/// Flights in the preferred part of the day first; all of them when none match.
fn by_time_of_day<'a>(flights: &'a [FlightOption], preferred: &str) -> Vec<&'a FlightOption> {
    let range = match preferred.to_lowercase().as_str() {
        "morning" => 0..12,
        "afternoon" => 12..17,
        "evening" | "night" => 17..24,
        _ => return flights.iter().collect(),
    };
    let matching: Vec<&FlightOption> = flights.iter().filter(|f| range.contains(&f.departure_time.hour())).collect();
    if matching.is_empty() {
        flights.iter().collect()
    } else {
        matching
    }
}
