use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MessageAppendedEvent {
    pub session_id: Uuid,
    pub message_id: Uuid,
    pub role: String,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SessionStateChangedEvent {
    pub session_id: Uuid,
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct FamilyActionExecutedEvent {
    pub session_id: Uuid,
    pub action_id: Uuid,
    pub action_type: String,
    pub status: String,
    pub result_message: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct LocationAlertRaisedEvent {
    pub session_id: Uuid,
    pub alert_id: Uuid,
    pub alert_type: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HandoffUpdatedEvent {
    pub dossier_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
    pub priority: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct FlightDisruptedEvent {
    pub flight_id: String,
    pub flight_number: String,
    pub status: String,
    pub affected_sessions: Vec<Uuid>,
    pub affected_codes: Vec<String>,
    pub timestamp: i64,
}

/// Everything published on the in-process event bus. Helper pages and the
/// agent console subscribe to this stream.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConciergeEvent {
    MessageAppended(MessageAppendedEvent),
    SessionStateChanged(SessionStateChangedEvent),
    FamilyActionExecuted(FamilyActionExecutedEvent),
    LocationAlertRaised(LocationAlertRaisedEvent),
    HandoffUpdated(HandoffUpdatedEvent),
    FlightDisrupted(FlightDisruptedEvent),
}

impl ConciergeEvent {
    /// Sessions this event concerns. A disruption can touch several.
    pub fn concerns_session(&self, session_id: Uuid) -> bool {
        match self {
            ConciergeEvent::MessageAppended(e) => e.session_id == session_id,
            ConciergeEvent::SessionStateChanged(e) => e.session_id == session_id,
            ConciergeEvent::FamilyActionExecuted(e) => e.session_id == session_id,
            ConciergeEvent::LocationAlertRaised(e) => e.session_id == session_id,
            ConciergeEvent::HandoffUpdated(e) => e.session_id == session_id,
            ConciergeEvent::FlightDisrupted(e) => e.affected_sessions.contains(&session_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConciergeEvent::MessageAppended(_) => "message_appended",
            ConciergeEvent::SessionStateChanged(_) => "session_state_changed",
            ConciergeEvent::FamilyActionExecuted(_) => "family_action_executed",
            ConciergeEvent::LocationAlertRaised(_) => "location_alert_raised",
            ConciergeEvent::HandoffUpdated(_) => "handoff_updated",
            ConciergeEvent::FlightDisrupted(_) => "flight_disrupted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged() {
        let session_id = Uuid::new_v4();
        let event = ConciergeEvent::MessageAppended(MessageAppendedEvent {
            session_id,
            message_id: Uuid::new_v4(),
            role: "family".to_string(),
            content: "Pick the 2pm flight, Mom".to_string(),
            timestamp: 0,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MESSAGE_APPENDED");
        assert_eq!(json["role"], "family");
        assert!(event.concerns_session(session_id));
        assert!(!event.concerns_session(Uuid::new_v4()));
    }

    #[test]
    fn test_disruption_concerns_every_affected_session() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let event = ConciergeEvent::FlightDisrupted(FlightDisruptedEvent {
            flight_id: "demo-DEMO123-1".to_string(),
            flight_number: "AA1234".to_string(),
            status: "cancelled".to_string(),
            affected_sessions: vec![a, b],
            affected_codes: vec!["DEMO123".to_string()],
            timestamp: 0,
        });
        assert!(event.concerns_session(a));
        assert!(event.concerns_session(b));
        assert_eq!(event.name(), "flight_disrupted");
    }
}
