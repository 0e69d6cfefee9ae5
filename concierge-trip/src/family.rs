use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use concierge_core::models::{
    ActionStatus, FamilyAction, FamilyActionType, Reservation, ReservationStatus, Session,
};
use concierge_core::CoreResult;
use concierge_shared::models::events::{ConciergeEvent, FamilyActionExecutedEvent};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::{ActionError, TripResult};
use crate::flights::FlightCatalog;
use crate::helper::HelperLinks;
use crate::notify::Notifier;
use crate::reservations::ReservationService;

#[derive(Debug, Clone, Serialize)]
pub struct ActionInfo {
    pub action_type: FamilyActionType,
    pub display_name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub action_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionHistoryItem {
    pub id: Uuid,
    pub action_type: String,
    pub display_name: String,
    pub action_data: Value,
    pub status: ActionStatus,
    pub family_notes: String,
    pub result_message: String,
    pub created_at: DateTime<Utc>,
}

impl From<FamilyAction> for ActionHistoryItem {
    fn from(action: FamilyAction) -> Self {
        let display_name = FamilyActionType::from_str(&action.action_type)
            .map(|t| t.display_name().to_string())
            .unwrap_or_else(|_| action.action_type.clone());
        Self {
            id: action.id,
            display_name,
            action_type: action.action_type,
            action_data: action.action_data,
            status: action.status,
            family_notes: action.family_notes,
            result_message: action.result_message,
            created_at: action.created_at,
        }
    }
}

/// What a successful action reports back.
struct Done {
    message: String,
    action_data: Value,
    details: Map<String, Value>,
}

/// Actions a family member can take through a helper link. Every attempt is
/// recorded, including the rejected ones.
#[derive(Clone)]
pub struct FamilyActions {
    ctx: TripContext,
}

impl FamilyActions {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    pub async fn available(&self, link: &str) -> TripResult<Vec<ActionInfo>> {
        let session = HelperLinks::new(self.ctx.clone()).resolve(link).await?;
        let reservation = self.reservation_of(&session).await?;
        Ok(match reservation {
            Some(r) if r.is_active() => FamilyActionType::ALL
                .iter()
                .map(|t| ActionInfo {
                    action_type: *t,
                    display_name: t.display_name(),
                    description: t.description(),
                    icon: t.icon(),
                    enabled: true,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Newest first.
    pub async fn history(&self, link: &str) -> TripResult<Vec<ActionHistoryItem>> {
        let session = HelperLinks::new(self.ctx.clone()).resolve(link).await?;
        let actions = self.ctx.store.list_actions(session.id).await?;
        Ok(actions.into_iter().map(ActionHistoryItem::from).collect())
    }

    pub async fn execute(&self, link: &str, action_type: &str, data: &Value, notes: &str) -> TripResult<ActionOutcome> {
        let mut session = HelperLinks::new(self.ctx.clone()).resolve(link).await?;

        let result = match FamilyActionType::from_str(action_type.trim()) {
            Ok(kind) => self.perform(kind, &mut session, data).await,
            Err(_) => Err(ActionError::UnknownType(action_type.trim().to_string())),
        };

        match result {
            Ok(done) => {
                let action = self
                    .record(&session, action_type, done.action_data, ActionStatus::Executed, notes, &done.message)
                    .await?;
                info!(session_id = %session.id, %action_type, "Family action executed");
                Ok(ActionOutcome {
                    success: true,
                    action_id: action.id,
                    message: Some(done.message),
                    error: None,
                    details: done.details,
                })
            }
            Err(ActionError::Core(e)) => Err(e.into()),
            Err(e) => {
                let error = e.to_string();
                let request = if data.is_object() { data.clone() } else { json!({}) };
                let action = self
                    .record(&session, action_type, request, ActionStatus::Failed, notes, &error)
                    .await?;
                warn!(session_id = %session.id, %action_type, %error, "Family action rejected");
                Ok(ActionOutcome {
                    success: false,
                    action_id: action.id,
                    message: None,
                    error: Some(error),
                    details: Map::new(),
                })
            }
        }
    }

    async fn perform(&self, kind: FamilyActionType, session: &mut Session, data: &Value) -> Result<Done, ActionError> {
        let reservation = self.reservation_of(session).await?.ok_or(ActionError::NoReservation)?;
        match kind {
            FamilyActionType::ChangeFlight => self.change_flight(reservation, data).await,
            FamilyActionType::CancelFlight => self.cancel_flight(reservation, data).await,
            FamilyActionType::SelectSeat => self.select_seat(reservation, data).await,
            FamilyActionType::AddBags => self.add_bags(session, data).await,
            FamilyActionType::RequestWheelchair => self.request_wheelchair(session, data).await,
        }
    }

    async fn change_flight(&self, reservation: Reservation, data: &Value) -> Result<Done, ActionError> {
        let segment = reservation.first_segment().ok_or(ActionError::NoSegment)?;
        let current = segment.flight.clone();
        let original_flight = json!({
            "flight_number": current.flight_number,
            "origin": current.origin,
            "destination": current.destination,
            "departure_time": current.departure_time,
            "arrival_time": current.arrival_time,
            "seat": segment.seat.clone().unwrap_or_else(|| "Not assigned".to_string()),
        });

        let wanted = text(data, "new_flight_id").unwrap_or_default();
        let date = (current.departure_time + Duration::days(1)).date_naive();
        let alternatives = FlightCatalog::new(self.ctx.clone())
            .alternatives(&current.origin, &current.destination, date)
            .await;
        let option = alternatives
            .iter()
            .find(|f| f.matches(&wanted))
            .or_else(|| alternatives.first())
            .cloned()
            .ok_or(ActionError::NewFlightNotFound)?;

        let change = ReservationService::new(self.ctx.clone())
            .apply_option(reservation, &option)
            .await
            .map_err(|e| match e {
                crate::error::TripError::Core(core) => ActionError::Core(core),
                _ => ActionError::NoSegment,
            })?;
        Notifier::new(self.ctx.clone())
            .change_confirmation(&change.reservation, &change.original, &change.new)
            .await;

        let new_flight = json!(option);
        Ok(Done {
            message: format!("Flight changed from {} to {}", current.flight_number, option.flight_number),
            action_data: json!({ "original_flight": original_flight, "new_flight": new_flight }),
            details: object(json!({ "original_flight": original_flight, "new_flight": new_flight })),
        })
    }

    async fn cancel_flight(&self, mut reservation: Reservation, data: &Value) -> Result<Done, ActionError> {
        if reservation.status == ReservationStatus::Cancelled {
            return Err(ActionError::AlreadyCancelled);
        }
        let cancelled: Vec<Value> = reservation
            .segments
            .iter()
            .map(|s| {
                json!({
                    "flight_number": s.flight.flight_number,
                    "origin": s.flight.origin,
                    "destination": s.flight.destination,
                    "departure_time": s.flight.departure_time,
                })
            })
            .collect();

        reservation.status = ReservationStatus::Cancelled;
        reservation.touch();
        self.ctx.store.save_reservation(&reservation).await?;

        Ok(Done {
            message: format!("Reservation {} has been cancelled", reservation.confirmation_code),
            action_data: json!({ "reason": text(data, "reason").unwrap_or_default(), "cancelled_flights": cancelled }),
            details: object(json!({ "cancelled_flights": cancelled })),
        })
    }

    async fn select_seat(&self, mut reservation: Reservation, data: &Value) -> Result<Done, ActionError> {
        let seat = text(data, "seat").ok_or(ActionError::SeatRequired)?.to_uppercase();
        let segment = match text(data, "flight_segment_id") {
            Some(id) => {
                let id = Uuid::parse_str(&id).map_err(|_| ActionError::SegmentNotFound)?;
                reservation.segments.iter_mut().find(|s| s.id == id).ok_or(ActionError::SegmentNotFound)?
            }
            None => reservation
                .segments
                .iter_mut()
                .min_by_key(|s| s.segment_order)
                .ok_or(ActionError::NoSegment)?,
        };

        let old_seat = segment.seat.replace(seat.clone());
        let flight_number = segment.flight.flight_number.clone();
        reservation.touch();
        self.ctx.store.save_reservation(&reservation).await?;

        Ok(Done {
            message: format!("Seat changed to {} on flight {}", seat, flight_number),
            action_data: json!({ "old_seat": old_seat, "new_seat": seat, "flight_number": flight_number }),
            details: object(json!({ "old_seat": old_seat, "new_seat": seat })),
        })
    }

    async fn add_bags(&self, session: &mut Session, data: &Value) -> Result<Done, ActionError> {
        let added = data.get("bag_count").and_then(Value::as_i64).filter(|n| *n > 0).unwrap_or(1);
        let total = session.context_value("checked_bags").and_then(Value::as_i64).unwrap_or(0) + added;
        session.set_context("checked_bags", json!(total));
        self.ctx.store.save_session(session).await?;

        Ok(Done {
            message: format!("Added {} checked bag(s). Total: {} bags", added, total),
            action_data: json!({ "bags_added": added, "total_bags": total }),
            details: object(json!({ "bags_added": added, "total_bags": total })),
        })
    }

    async fn request_wheelchair(&self, session: &mut Session, data: &Value) -> Result<Done, ActionError> {
        let assistance = text(data, "assistance_type").unwrap_or_else(|| "wheelchair".to_string());
        session.set_context(
            "wheelchair_assistance",
            json!({ "type": assistance, "requested_at": Utc::now() }),
        );
        self.ctx.store.save_session(session).await?;

        let name = match assistance.as_str() {
            "wheelchair" => "Wheelchair",
            "wheelchair_ramp" => "Wheelchair with Ramp",
            "escort" => "Escort Assistance",
            other => other,
        };
        Ok(Done {
            message: format!("{} assistance has been requested", name),
            action_data: json!({ "assistance_type": assistance }),
            details: object(json!({ "assistance_type": assistance })),
        })
    }

    async fn reservation_of(&self, session: &Session) -> CoreResult<Option<Reservation>> {
        match session.reservation_id {
            Some(id) => self.ctx.store.get_reservation(id).await,
            None => Ok(None),
        }
    }

    async fn record(
        &self,
        session: &Session,
        action_type: &str,
        action_data: Value,
        status: ActionStatus,
        notes: &str,
        result_message: &str,
    ) -> TripResult<FamilyAction> {
        let action = FamilyAction {
            id: Uuid::new_v4(),
            session_id: session.id,
            action_type: action_type.trim().to_string(),
            action_data,
            status,
            family_notes: notes.to_string(),
            result_message: result_message.to_string(),
            created_at: Utc::now(),
        };
        self.ctx.store.record_action(&action).await?;
        self.ctx.events.publish(ConciergeEvent::FamilyActionExecuted(FamilyActionExecutedEvent {
            session_id: session.id,
            action_id: action.id,
            action_type: action.action_type.clone(),
            status: status.to_string(),
            result_message: action.result_message.clone(),
            timestamp: action.created_at.timestamp(),
        }));
        Ok(action)
    }
}

fn text(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, seeded, session_for};

    async fn setup(code: &str) -> (TripContext, Reservation, String) {
        let (ctx, reservation) = seeded(code).await;
        let session = session_for(&ctx, &reservation).await;
        (ctx, reservation, session.helper_link.unwrap())
    }

    #[tokio::test]
    async fn test_available_actions() {
        let (ctx, _, link) = setup("DEMO123").await;
        let actions = FamilyActions::new(ctx.clone());
        assert_eq!(actions.available(&link).await.unwrap().len(), 5);

        actions.execute(&link, "cancel_flight", &json!({}), "").await.unwrap();
        assert!(actions.available(&link).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_actions_without_reservation() {
        let ctx = context();
        let mut session = Session::new(Duration::minutes(30));
        session.helper_link = Some("bare-link".to_string());
        ctx.store.save_session(&session).await.unwrap();

        assert!(FamilyActions::new(ctx).available("bare-link").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_change_flight_by_number() {
        let (ctx, reservation, link) = setup("DEMO123").await;
        let actions = FamilyActions::new(ctx.clone());

        let date = (reservation.first_flight().unwrap().departure_time + Duration::days(1)).date_naive();
        let target = concierge_assist::mock_alternatives("DFW", "ORD", date)[2].clone();

        let outcome = actions
            .execute(&link, "change_flight", &json!({ "new_flight_id": target.flight_number }), "Evening is better")
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message.unwrap(), format!("Flight changed from AA1234 to {}", target.flight_number));
        assert_eq!(outcome.details["original_flight"]["seat"], "14A");

        let stored = ctx.store.get_reservation(reservation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Changed);
        assert_eq!(stored.first_flight().unwrap().flight_number, target.flight_number);
    }

    #[tokio::test]
    async fn test_cancel_twice_is_recorded_as_failure() {
        let (ctx, _, link) = setup("DEMO123").await;
        let actions = FamilyActions::new(ctx);

        let first = actions.execute(&link, "cancel_flight", &json!({ "reason": "sick" }), "").await.unwrap();
        assert_eq!(first.message.as_deref(), Some("Reservation DEMO123 has been cancelled"));

        let second = actions.execute(&link, "cancel_flight", &json!({}), "").await.unwrap();
        assert!(!second.success);
        assert_eq!(second.error.as_deref(), Some("Reservation already cancelled"));

        let history = actions.history(&link).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, ActionStatus::Failed);
        assert_eq!(history[1].display_name, "Cancel Flight");
    }

    #[tokio::test]
    async fn test_seat_bags_and_wheelchair() {
        let (ctx, reservation, link) = setup("TEST456").await;
        let actions = FamilyActions::new(ctx.clone());

        let second_leg = reservation.segments[1].id.to_string();
        let seat = actions
            .execute(&link, "select_seat", &json!({ "seat": "3c", "flight_segment_id": second_leg }), "")
            .await
            .unwrap();
        assert_eq!(seat.message.as_deref(), Some("Seat changed to 3C on flight AA890"));
        assert_eq!(seat.details["old_seat"], "8F");

        actions.execute(&link, "add_bags", &json!({ "bag_count": 2 }), "").await.unwrap();
        let bags = actions.execute(&link, "add_bags", &json!({}), "").await.unwrap();
        assert_eq!(bags.message.as_deref(), Some("Added 1 checked bag(s). Total: 3 bags"));

        let chair = actions
            .execute(&link, "request_wheelchair", &json!({ "assistance_type": "wheelchair_ramp" }), "")
            .await
            .unwrap();
        assert_eq!(chair.message.as_deref(), Some("Wheelchair with Ramp assistance has been requested"));

        let unknown_segment = actions
            .execute(&link, "select_seat", &json!({ "seat": "1A", "flight_segment_id": Uuid::new_v4().to_string() }), "")
            .await
            .unwrap();
        assert_eq!(unknown_segment.error.as_deref(), Some("Flight segment not found"));
    }

    #[tokio::test]
    async fn test_unknown_type_and_missing_reservation() {
        let ctx = context();
        let mut session = Session::new(Duration::minutes(30));
        session.helper_link = Some("lonely".to_string());
        ctx.store.save_session(&session).await.unwrap();
        let actions = FamilyActions::new(ctx);

        let outcome = actions.execute("lonely", "upgrade_cabin", &json!({}), "").await.unwrap();
        assert_eq!(outcome.error.as_deref(), Some("Unknown action type: upgrade_cabin"));

        let outcome = actions.execute("lonely", "add_bags", &json!({}), "").await.unwrap();
        assert_eq!(outcome.error.as_deref(), Some("No reservation found"));
        assert!(actions.available("lonely").await.unwrap().is_empty());
    }
}
