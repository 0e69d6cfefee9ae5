use chrono::{DateTime, Utc};
use concierge_core::models::{FlightStatus, Language, Message, MessageRole, SessionState};
use concierge_core::search::FlightOption;
use concierge_shared::models::events::{ConciergeEvent, FlightDisruptedEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::{TripError, TripResult};
use crate::flights::FlightCatalog;
use crate::format::{clock, long_datetime};

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: FlightStatus,
    pub departure_time: Option<DateTime<Utc>>,
    pub gate: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisruptionReport {
    pub flight_id: String,
    pub flight_number: String,
    pub status: FlightStatus,
    pub affected_reservations: Vec<String>,
    pub notified_sessions: usize,
}

/// Applies operational flight updates and tells affected passengers about delays
/// and cancellations.
#[derive(Clone)]
pub struct DisruptionManager {
    ctx: TripContext,
}

impl DisruptionManager {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    pub async fn update_status(&self, flight_id: &str, update: StatusUpdate) -> TripResult<DisruptionReport> {
        let mut flight = self
            .ctx
            .store
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| TripError::not_found("Flight not found"))?;

        if let Some(departure) = update.departure_time {
            // block time is kept
            let shift = departure - flight.departure_time;
            flight.departure_time = departure;
            flight.arrival_time += shift;
        }
        if let Some(gate) = update.gate.map(|g| g.trim().to_uppercase()).filter(|g| !g.is_empty()) {
            flight.gate = Some(gate);
        }
        flight.status = update.status;
        self.ctx.store.save_flight(&flight).await?;
        info!(flight_id = %flight.id, flight_number = %flight.flight_number, status = %flight.status, "Flight status updated");

        let mut report = DisruptionReport {
            flight_id: flight.id.clone(),
            flight_number: flight.flight_number.clone(),
            status: flight.status,
            affected_reservations: Vec::new(),
            notified_sessions: 0,
        };
        if !flight.status.is_disruption() {
            return Ok(report);
        }

        let options = if flight.status == FlightStatus::Cancelled {
            FlightCatalog::new(self.ctx.clone())
                .alternatives(&flight.origin, &flight.destination, flight.departure_time.date_naive())
                .await
        } else {
            Vec::new()
        };

        let now = Utc::now();
        let mut affected_sessions: Vec<Uuid> = Vec::new();
        for reservation in self.ctx.store.reservations_on_flight(&flight.id).await? {
            if !reservation.is_active() {
                continue;
            }
            report.affected_reservations.push(reservation.confirmation_code.clone());
            let language = reservation.passenger.language;

            for mut session in self.ctx.store.sessions_for_reservation(reservation.id).await? {
                if session.is_expired_at(now) {
                    continue;
                }
                let notice = notice(&flight.flight_number, flight.status, flight.departure_time, options.first(), language);
                if let Some(first) = options.first() {
                    session.set_context("pending_flight", json!(first));
                    session.set_context("flight_options", json!(options));
                    self.ctx.transition(&mut session, SessionState::Changing);
                }
                session.set_context("disruption", json!({ "flight_id": flight.id, "status": flight.status }));
                self.ctx.store.save_session(&session).await?;

                let message = Message::new(session.id, MessageRole::Assistant, notice)
                    .with_intent("flight_disruption", json!({ "flight_number": flight.flight_number }));
                self.ctx.append(&message).await?;
                affected_sessions.push(session.id);
            }
        }
        report.notified_sessions = affected_sessions.len();

        if report.affected_reservations.is_empty() {
            warn!(flight_id = %flight.id, "Disruption touched no active reservations");
        }
        self.ctx.events.publish(ConciergeEvent::FlightDisrupted(FlightDisruptedEvent {
            flight_id: flight.id.clone(),
            flight_number: flight.flight_number.clone(),
            status: flight.status.to_string(),
            affected_sessions,
            affected_codes: report.affected_reservations.clone(),
            timestamp: now.timestamp(),
        }));
        Ok(report)
    }
}

fn notice(
    flight_number: &str,
    status: FlightStatus,
    departure: DateTime<Utc>,
    first_option: Option<&FlightOption>,
    language: Language,
) -> String {
    match (status, first_option, language) {
        (FlightStatus::Cancelled, Some(option), Language::Es) => format!(
            "Lo siento, el vuelo {} fue cancelado. Encontré otros vuelos para usted. Hay uno a las {}. ¿Quiere que se lo reserve?",
            flight_number,
            clock(option.departure_time)
        ),
        (FlightStatus::Cancelled, Some(option), Language::En) => format!(
            "I'm sorry, flight {} has been cancelled. I found some other flights for you. There's one at {}. Would you like me to book that for you?",
            flight_number,
            clock(option.departure_time)
        ),
        (FlightStatus::Cancelled, None, Language::Es) => format!(
            "Lo siento, el vuelo {} fue cancelado. Un agente puede ayudarle a encontrar otro vuelo.",
            flight_number
        ),
        (FlightStatus::Cancelled, None, Language::En) => format!(
            "I'm sorry, flight {} has been cancelled. An agent can help you find another flight.",
            flight_number
        ),
        (_, _, Language::Es) => format!(
            "Aviso: el vuelo {} está retrasado. La nueva salida es el {}.",
            flight_number,
            long_datetime(departure, Language::Es)
        ),
        (_, _, Language::En) => format!(
            "Heads up: flight {} is delayed. It now departs {}.",
            flight_number,
            long_datetime(departure, Language::En)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded, session_for};
    use chrono::Duration;

    #[tokio::test]
    async fn test_delay_shifts_times_and_notifies() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let session = session_for(&ctx, &reservation).await;
        let flight = reservation.first_flight().unwrap().clone();
        let mut events = ctx.events.subscribe();

        let later = flight.departure_time + Duration::hours(2);
        let report = DisruptionManager::new(ctx.clone())
            .update_status(
                &flight.id,
                StatusUpdate { status: FlightStatus::Delayed, departure_time: Some(later), gate: Some("b22".to_string()) },
            )
            .await
            .unwrap();

        assert_eq!(report.affected_reservations, vec!["DEMO123".to_string()]);
        assert_eq!(report.notified_sessions, 1);

        let stored = ctx.store.get_flight(&flight.id).await.unwrap().unwrap();
        assert_eq!(stored.arrival_time, flight.arrival_time + Duration::hours(2));
        assert_eq!(stored.gate.as_deref(), Some("B22"));

        let messages = ctx.store.list_messages(session.id).await.unwrap();
        assert!(messages[0].content.starts_with("Heads up: flight AA1234 is delayed."));

        let disrupted = std::iter::from_fn(|| events.try_recv().ok())
            .find(|e| matches!(e, ConciergeEvent::FlightDisrupted(_)))
            .unwrap();
        assert!(disrupted.concerns_session(session.id));
    }

    #[tokio::test]
    async fn test_cancellation_offers_alternatives() {
        let (ctx, reservation) = seeded("ABUELA1").await;
        let session = session_for(&ctx, &reservation).await;
        let flight_id = reservation.first_flight().unwrap().id.clone();

        DisruptionManager::new(ctx.clone())
            .update_status(&flight_id, StatusUpdate { status: FlightStatus::Cancelled, departure_time: None, gate: None })
            .await
            .unwrap();

        let session = ctx.store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(session.state, SessionState::Changing);
        assert!(session.context_value("pending_flight").is_some());
        let messages = ctx.store.list_messages(session.id).await.unwrap();
        assert!(messages[0].content.starts_with("Lo siento, el vuelo AA2345 fue cancelado."));
    }

    #[tokio::test]
    async fn test_on_time_update_and_unknown_flight() {
        let (ctx, reservation) = seeded("DEMO123").await;
        let session = session_for(&ctx, &reservation).await;
        let manager = DisruptionManager::new(ctx.clone());
        let flight_id = reservation.first_flight().unwrap().id.clone();

        let report = manager
            .update_status(&flight_id, StatusUpdate { status: FlightStatus::Boarding, departure_time: None, gate: None })
            .await
            .unwrap();
        assert!(report.affected_reservations.is_empty());
        assert!(ctx.store.list_messages(session.id).await.unwrap().is_empty());

        let err = manager
            .update_status("nope", StatusUpdate { status: FlightStatus::Delayed, departure_time: None, gate: None })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Flight not found");
    }
}
