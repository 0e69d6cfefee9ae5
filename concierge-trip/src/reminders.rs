use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use concierge_core::models::{FlightSegment, Language, Reservation, ReservationStatus};
use concierge_core::providers::OutboundCall;
use concierge_shared::Masked;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::context::TripContext;
use crate::error::{TripError, TripResult};
use crate::reservations::ReservationService;

/// Due segments depart within `[now + window, now + window + SLACK]`.
const WINDOW_SLACK_MINUTES: i64 = 5;

/// How long a placed reminder suppresses repeats of the same call.
const DEDUPE_TTL_SECONDS: u64 = 2 * 60 * 60;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    #[serde(rename = "departure_1hr")]
    Departure1Hr,
    GateClosing,
    FinalBoarding,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 3] =
        [ReminderKind::Departure1Hr, ReminderKind::GateClosing, ReminderKind::FinalBoarding];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::Departure1Hr => "departure_1hr",
            ReminderKind::GateClosing => "gate_closing",
            ReminderKind::FinalBoarding => "final_boarding",
        }
    }

    /// Minutes before departure.
    pub fn window_minutes(&self) -> i64 {
        match self {
            ReminderKind::Departure1Hr => 60,
            ReminderKind::GateClosing => 30,
            ReminderKind::FinalBoarding => 15,
        }
    }

    pub fn first_message(&self, passenger_name: &str, flight_number: &str, gate: Option<&str>, language: Language) -> String {
        match (language, self) {
            (Language::Es, ReminderKind::Departure1Hr) => format!(
                "Hola {}, este es un recordatorio de American Airlines. Su vuelo {} sale en aproximadamente una hora desde la puerta {}.",
                passenger_name, flight_number, gate.unwrap_or("indicada en el tablero")
            ),
            (Language::Es, ReminderKind::GateClosing) => format!(
                "Hola {}, le llamo de American Airlines. Su vuelo {} está abordando en la puerta {}. Por favor diríjase a la puerta inmediatamente.",
                passenger_name, flight_number, gate.unwrap_or("indicada en el tablero")
            ),
            (Language::Es, ReminderKind::FinalBoarding) => format!(
                "Llamada final para {}. Su vuelo {} está cerrando las puertas. Por favor preséntese inmediatamente en la puerta {}.",
                passenger_name, flight_number, gate.unwrap_or("de embarque")
            ),
            (Language::En, ReminderKind::Departure1Hr) => format!(
                "Hello {}, this is a reminder from American Airlines. Your flight {} departs in approximately one hour from gate {}.",
                passenger_name, flight_number, gate.unwrap_or("shown on the departure board")
            ),
            (Language::En, ReminderKind::GateClosing) => format!(
                "Hello {}, this is American Airlines calling. Your flight {} is now boarding at gate {}. Please proceed to the gate immediately.",
                passenger_name, flight_number, gate.unwrap_or("shown on the departure board")
            ),
            (Language::En, ReminderKind::FinalBoarding) => format!(
                "Final call for {}. Your flight {} is closing doors. Please report to gate {} immediately.",
                passenger_name, flight_number, gate.unwrap_or("shown on the departure board")
            ),
        }
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderKind {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReminderKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| TripError::validation(format!("Unknown reminder type: {}", s.trim())))
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Called,
    Failed,
    Skipped,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Called => "called",
            ReminderStatus::Failed => "failed",
            ReminderStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderResult {
    pub passenger: String,
    pub flight: String,
    pub confirmation_code: String,
    pub reminder_type: ReminderKind,
    pub status: ReminderStatus,
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
}

/// A call a voice vendor accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCall {
    pub provider: &'static str,
    pub call_id: String,
}

/// Outbound reminder calls ahead of departure.
#[derive(Clone)]
pub struct Reminders {
    ctx: TripContext,
}

impl Reminders {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// One sweep over every window. Segments already called for a window are left out.
    pub async fn run_due(&self) -> TripResult<Vec<ReminderResult>> {
        let now = Utc::now();
        let mut results = Vec::new();
        for kind in ReminderKind::ALL {
            for (reservation, segment) in self.due(kind, now).await? {
                let key = format!("reminder:{}:{}", segment.id, kind);
                if !self.ctx.cache.set_nx_ex(&key, "1", DEDUPE_TTL_SECONDS).await? {
                    continue;
                }
                results.push(self.remind(&reservation, &segment, kind).await);
            }
        }
        if !results.is_empty() {
            info!(count = results.len(), "Reminder sweep finished");
        }
        Ok(results)
    }

    /// Segments of live reservations departing inside the window of `kind`.
    pub async fn due(&self, kind: ReminderKind, now: DateTime<Utc>) -> TripResult<Vec<(Reservation, FlightSegment)>> {
        let from = now + Duration::minutes(kind.window_minutes());
        let to = from + Duration::minutes(WINDOW_SLACK_MINUTES);
        let reservations = self.ctx.store.reservations_departing_between(from, to).await?;

        Ok(reservations
            .into_iter()
            .filter(|r| matches!(r.status, ReservationStatus::Confirmed | ReservationStatus::Changed))
            .flat_map(|r| {
                r.segments
                    .iter()
                    .filter(|s| s.flight.departure_time >= from && s.flight.departure_time <= to)
                    .cloned()
                    .map(|s| (r.clone(), s))
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    /// Calls the passenger of `code` about their first segment right away.
    pub async fn send_manual(&self, code: &str, kind: ReminderKind) -> TripResult<ReminderResult> {
        let reservation = ReservationService::new(self.ctx.clone())
            .find_by_code(code)
            .await?
            .ok_or_else(|| TripError::not_found("Reservation not found"))?;
        let segment = reservation
            .first_segment()
            .cloned()
            .ok_or_else(|| TripError::not_found("No flight segments for reservation"))?;
        Ok(self.remind(&reservation, &segment, kind).await)
    }

    async fn remind(&self, reservation: &Reservation, segment: &FlightSegment, kind: ReminderKind) -> ReminderResult {
        let passenger = &reservation.passenger;
        let flight = &segment.flight;
        let mut result = ReminderResult {
            passenger: passenger.full_name(),
            flight: flight.flight_number.clone(),
            confirmation_code: reservation.confirmation_code.clone(),
            reminder_type: kind,
            status: ReminderStatus::Skipped,
            call_id: None,
            provider: None,
        };

        let Some(phone) = &passenger.phone else {
            info!(code = %reservation.confirmation_code, "No phone on file, reminder skipped");
            return result;
        };

        let first_message =
            kind.first_message(&passenger.full_name(), &flight.flight_number, flight.gate.as_deref(), passenger.language);
        let variables = json!({
            "reminder_type": kind.as_str(),
            "passenger_name": passenger.full_name(),
            "flight_number": flight.flight_number,
            "origin": flight.origin,
            "destination": flight.destination,
            "departure_time": flight.departure_time,
            "gate": flight.gate.as_deref().unwrap_or("TBD"),
            "seat": segment.seat.as_deref().unwrap_or("Not assigned"),
            "language": passenger.language,
        });

        match dial(&self.ctx, phone, first_message, passenger.language, variables).await {
            Some(call) => {
                result.status = ReminderStatus::Called;
                result.call_id = Some(call.call_id);
                result.provider = Some(call.provider);
            }
            None => result.status = ReminderStatus::Failed,
        }
        result
    }
}

/// Tries each configured caller in preference order. `None` when nobody could place the call.
pub async fn dial(
    ctx: &TripContext,
    to: &Masked<String>,
    first_message: String,
    language: Language,
    dynamic_variables: serde_json::Value,
) -> Option<PlacedCall> {
    if ctx.vendors.callers.is_empty() {
        warn!(%to, "No voice provider configured for outbound calls");
        return None;
    }
    let call = OutboundCall { to_number: to.clone(), first_message, language, dynamic_variables };
    for caller in &ctx.vendors.callers {
        match caller.place_call(&call).await {
            Ok(call_id) => {
                info!(%to, provider = caller.name(), %call_id, "Outbound call placed");
                return Some(PlacedCall { provider: caller.name(), call_id });
            }
            Err(e) => warn!(%to, provider = caller.name(), "Outbound call failed: {}", e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubCaller};
    use concierge_core::demo::demo_reservation;
    use concierge_vendors::VendorSet;

    async fn departing_in(ctx: &TripContext, code: &str, minutes: i64) -> Reservation {
        let mut reservation = demo_reservation(code, Utc::now()).unwrap();
        reservation.segments.truncate(1);
        reservation.segments[0].flight.departure_time = Utc::now() + Duration::minutes(minutes);
        ctx.store.save_reservation(&reservation).await.unwrap();
        reservation
    }

    #[tokio::test]
    async fn test_due_reminder_called_once() {
        let caller = StubCaller::new("elevenlabs");
        let ctx = context().with_vendors(VendorSet { callers: vec![caller.clone()], ..VendorSet::default() });
        departing_in(&ctx, "DEMO123", 32).await;
        let reminders = Reminders::new(ctx);

        let results = reminders.run_due().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reminder_type, ReminderKind::GateClosing);
        assert_eq!(results[0].status, ReminderStatus::Called);
        assert_eq!(results[0].call_id.as_deref(), Some("elevenlabs-call-1"));

        assert!(reminders.run_due().await.unwrap().is_empty());
        assert_eq!(caller.count(), 1);
        let placed = caller.placed.lock().unwrap();
        assert!(placed[0].first_message.starts_with("Hello Margaret Johnson, this is American Airlines calling."));
    }

    #[tokio::test]
    async fn test_falls_back_to_second_provider() {
        let primary = StubCaller::failing("elevenlabs");
        let backup = StubCaller::new("retell");
        let ctx = context().with_vendors(VendorSet {
            callers: vec![primary.clone(), backup.clone()],
            ..VendorSet::default()
        });
        departing_in(&ctx, "ABUELA1", 62).await;

        let results = Reminders::new(ctx).run_due().await.unwrap();
        assert_eq!(results[0].provider, Some("retell"));
        assert_eq!(backup.count(), 1);
        let placed = backup.placed.lock().unwrap();
        assert!(placed[0].first_message.starts_with("Hola Maria Garcia"));
    }

    #[tokio::test]
    async fn test_cancelled_and_out_of_window_ignored() {
        let ctx = context();
        let mut cancelled = departing_in(&ctx, "DEMO123", 16).await;
        cancelled.status = ReservationStatus::Cancelled;
        ctx.store.save_reservation(&cancelled).await.unwrap();
        departing_in(&ctx, "SENIOR2", 45).await;

        let reminders = Reminders::new(ctx);
        let now = Utc::now();
        for kind in ReminderKind::ALL {
            assert!(reminders.due(kind, now).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_manual_reminder_without_providers_fails() {
        let reminders = Reminders::new(context());
        let result = reminders.send_manual("demo123", ReminderKind::FinalBoarding).await.unwrap();
        assert_eq!(result.status, ReminderStatus::Failed);
        assert_eq!(result.flight, "AA1234");

        let err = reminders.send_manual("NOPE99", ReminderKind::GateClosing).await.unwrap_err();
        assert_eq!(err.to_string(), "Reservation not found");
        assert!("boarding".parse::<ReminderKind>().is_err());
        assert_eq!("departure_1hr".parse::<ReminderKind>().unwrap(), ReminderKind::Departure1Hr);
    }
}
