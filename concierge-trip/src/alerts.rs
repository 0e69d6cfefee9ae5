use chrono::{Duration, Utc};
use concierge_core::models::{AlertType, Language, LocationAlert};
use concierge_shared::models::events::{ConciergeEvent, LocationAlertRaisedEvent};
use concierge_shared::Masked;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::{TripError, TripResult};
use crate::location::{AlertStatus, LocationMetrics, LocationTracker, WARNING_BUFFER_MIN};
use crate::notify::Notifier;
use crate::reminders::dial;

#[derive(Debug, Clone, Serialize)]
pub struct AlertOutcome {
    pub alert_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub voice_call_sent: bool,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

/// Running-late and urgent alerts: a call to the passenger, an email to the
/// registered family helper and a dashboard notice.
#[derive(Clone)]
pub struct LocationAlerts {
    ctx: TripContext,
}

impl LocationAlerts {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Raises whatever alert the current status calls for.
    pub async fn check_and_send(&self, session_id: Uuid, metrics: &LocationMetrics) -> TripResult<Option<AlertOutcome>> {
        match metrics.metrics.alert_status {
            AlertStatus::Urgent => self.send(session_id, AlertType::Urgent, false).await,
            AlertStatus::Warning => self.send(session_id, AlertType::RunningLate, false).await,
            AlertStatus::Safe | AlertStatus::Arrived => Ok(None),
        }
    }

    /// `None` when the session has no trip or the cooldown for this type is running.
    /// `force` skips the cooldown.
    pub async fn send(&self, session_id: Uuid, alert_type: AlertType, force: bool) -> TripResult<Option<AlertOutcome>> {
        let cooldown = match alert_type {
            AlertType::RunningLate => self.ctx.rules.running_late_cooldown_minutes,
            AlertType::Urgent => self.ctx.rules.urgent_cooldown_minutes,
            other => return Err(TripError::validation(format!("Alerts of type {} cannot be sent", other))),
        };

        let mut session = self.ctx.session(session_id).await?;
        let Some(reservation) = (match session.reservation_id {
            Some(id) => self.ctx.store.get_reservation(id).await?,
            None => None,
        }) else {
            warn!(%session_id, "No reservation for location alert");
            return Ok(None);
        };
        let Some(segment) = reservation.first_segment().cloned() else {
            return Ok(None);
        };

        if !force {
            if let Some(recent) = self.ctx.store.latest_alert(session.id, alert_type).await? {
                if recent.created_at >= Utc::now() - Duration::minutes(cooldown) {
                    info!(%session_id, %alert_type, "Alert cooldown active");
                    return Ok(None);
                }
            }
        }

        let metrics = LocationTracker::new(self.ctx.clone()).metrics(session.id).await?;
        let walking = metrics.metrics.walking_time_minutes.unwrap_or(0);
        let time_to_departure = metrics.metrics.time_to_departure_minutes.unwrap_or(0);

        let passenger = &reservation.passenger;
        let flight = &segment.flight;
        let gate = flight.gate.as_deref().unwrap_or("your gate");
        let message = alert_message(alert_type, &passenger.first_name, gate, walking, time_to_departure, passenger.language);

        let mut alert = LocationAlert {
            id: Uuid::new_v4(),
            session_id: session.id,
            alert_type,
            message: message.clone(),
            distance_to_gate: metrics.metrics.distance_meters.map(|d| d as f64),
            estimated_walking_time: Some(walking),
            time_to_departure: Some(time_to_departure),
            acknowledged: false,
            voice_call_sent: false,
            email_sent: false,
            created_at: Utc::now(),
        };

        let mut call_id = None;
        if let Some(phone) = &passenger.phone {
            let variables = json!({
                "reminder_type": alert_type.as_str(),
                "passenger_name": passenger.full_name(),
                "flight_number": flight.flight_number,
                "origin": flight.origin,
                "destination": flight.destination,
                "departure_time": flight.departure_time,
                "gate": flight.gate.as_deref().unwrap_or("TBD"),
                "seat": segment.seat.as_deref().unwrap_or("Not assigned"),
                "directions": metrics.directions,
            });
            if let Some(call) = dial(&self.ctx, phone, message.clone(), passenger.language, variables).await {
                alert.voice_call_sent = true;
                call_id = Some(call.call_id);
            }
        }

        if let Some(helper_email) = session.context_str("helper_email").map(|e| Masked::from(e.to_string())) {
            let body = if metrics.directions.is_empty() {
                message.clone()
            } else {
                format!("{} {}", message, metrics.directions)
            };
            alert.email_sent = Notifier::new(self.ctx.clone())
                .running_late_alert(&helper_email, &passenger.full_name(), &flight.flight_number, &body)
                .await;
        }

        session.set_context(
            "location_alert",
            json!({
                "type": alert_type.as_str(),
                "timestamp": alert.created_at,
                "message": message,
                "metrics": {
                    "distance_meters": metrics.metrics.distance_meters,
                    "walking_time_minutes": walking,
                    "time_to_departure_minutes": time_to_departure,
                },
            }),
        );
        self.ctx.store.save_alert(&alert).await?;
        self.ctx.store.save_session(&session).await?;

        self.ctx.events.publish(ConciergeEvent::LocationAlertRaised(LocationAlertRaisedEvent {
            session_id: session.id,
            alert_id: alert.id,
            alert_type: alert_type.to_string(),
            message: message.clone(),
            timestamp: alert.created_at.timestamp(),
        }));
        info!(
            %session_id,
            %alert_type,
            voice_call_sent = alert.voice_call_sent,
            email_sent = alert.email_sent,
            "Location alert raised"
        );

        Ok(Some(AlertOutcome {
            alert_id: alert.id,
            alert_type,
            message,
            voice_call_sent: alert.voice_call_sent,
            email_sent: alert.email_sent,
            call_id,
        }))
    }

    /// False when no such alert exists.
    pub async fn acknowledge(&self, alert_id: Uuid) -> TripResult<bool> {
        Ok(self.ctx.store.acknowledge_alert(alert_id).await?)
    }
}

fn alert_message(
    alert_type: AlertType,
    first_name: &str,
    gate: &str,
    walking: i64,
    time_to_departure: i64,
    language: Language,
) -> String {
    let closes_in = time_to_departure - WARNING_BUFFER_MIN;
    match (alert_type, language) {
        (AlertType::Urgent, Language::Es) => format!(
            "URGENTE: {}, puede perder su vuelo! La puerta {} cierra en {} minutos y usted esta a {} minutos de distancia. Por favor corra a su puerta inmediatamente!",
            first_name, gate, closes_in, walking
        ),
        (AlertType::Urgent, Language::En) => format!(
            "URGENT: {}, you may miss your flight! Gate {} closes in {} minutes and you are {} minutes away. Please hurry to your gate immediately!",
            first_name, gate, closes_in, walking
        ),
        (_, Language::Es) => format!(
            "{}, puede estar llegando tarde a su puerta. La puerta {} esta a aproximadamente {} minutos caminando, y su vuelo sale en {} minutos. Por favor dirijase a la puerta ahora.",
            first_name, gate, walking, time_to_departure
        ),
        (_, Language::En) => format!(
            "{}, you may be running late for your gate. Gate {} is about {} minutes away, and your flight departs in {} minutes. Please head to your gate now.",
            first_name, gate, walking, time_to_departure
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{seeded, session_for, StubCaller, StubMailer};
    use concierge_vendors::VendorSet;

    async fn running_late() -> (TripContext, Uuid, Arc<StubCaller>, Arc<StubMailer>) {
        let caller = StubCaller::new("retell");
        let mailer = Arc::new(StubMailer::default());
        let (ctx, mut reservation) = seeded("DEMO123").await;
        let ctx = ctx.with_vendors(VendorSet {
            callers: vec![caller.clone()],
            mailer: Some(mailer.clone()),
            ..VendorSet::default()
        });
        reservation.segments[0].flight.departure_time = Utc::now() + Duration::minutes(46);
        ctx.store.save_reservation(&reservation).await.unwrap();

        let mut session = session_for(&ctx, &reservation).await;
        session.set_context("helper_email", json!("daughter@example.com"));
        ctx.store.save_session(&session).await.unwrap();
        (ctx, session.id, caller, mailer)
    }

    #[tokio::test]
    async fn test_warning_update_calls_and_emails() {
        let (ctx, session_id, caller, mailer) = running_late().await;
        let mut events = ctx.events.subscribe();

        // ~1 km south of gate A12
        let update = LocationTracker::new(ctx.clone()).update(session_id, 32.8920, -97.0355, None).await.unwrap();

        let alert = update.alert.unwrap();
        assert_eq!(alert.alert_type, AlertType::RunningLate);
        assert!(alert.voice_call_sent && alert.email_sent);
        assert!(alert.message.starts_with("Margaret, you may be running late for your gate. Gate A12 is about 20 minutes away"));
        assert_eq!(caller.count(), 1);
        assert_eq!(mailer.subjects(), vec!["Alert: Margaret Johnson may be running late for flight AA1234"]);

        let session = ctx.store.get_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.context_value("location_alert").unwrap()["type"], "running_late");
        assert!(matches!(events.try_recv().unwrap(), ConciergeEvent::LocationAlertRaised(_)));
    }

    #[tokio::test]
    async fn test_cooldown_and_force() {
        let (ctx, session_id, caller, _) = running_late().await;
        let alerts = LocationAlerts::new(ctx);

        assert!(alerts.send(session_id, AlertType::RunningLate, false).await.unwrap().is_some());
        assert!(alerts.send(session_id, AlertType::RunningLate, false).await.unwrap().is_none());
        assert!(alerts.send(session_id, AlertType::RunningLate, true).await.unwrap().is_some());
        // cooldowns are per type
        let urgent = alerts.send(session_id, AlertType::Urgent, false).await.unwrap().unwrap();
        assert!(urgent.message.starts_with("URGENT: Margaret, you may miss your flight!"));
        assert_eq!(caller.count(), 3);

        assert!(alerts.send(session_id, AlertType::Arrived, true).await.is_err());
    }

    #[tokio::test]
    async fn test_acknowledge() {
        let (ctx, session_id, _, _) = running_late().await;
        let alerts = LocationAlerts::new(ctx.clone());
        let outcome = alerts.send(session_id, AlertType::RunningLate, true).await.unwrap().unwrap();

        let metrics = LocationTracker::new(ctx.clone()).metrics(session_id).await.unwrap();
        assert_eq!(metrics.alert.unwrap().id, outcome.alert_id);

        assert!(alerts.acknowledge(outcome.alert_id).await.unwrap());
        assert!(!alerts.acknowledge(Uuid::new_v4()).await.unwrap());
        let metrics = LocationTracker::new(ctx).metrics(session_id).await.unwrap();
        assert!(metrics.alert.is_none());
    }
}
