use chrono::{DateTime, Duration, Utc};
use concierge_shared::Masked;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::CoreError;

/// Text form of the closed enums below, shared by Postgres columns and logs.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(CoreError::ValidationError(format!(
                        "Unknown {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

// ============================================================================
// Passenger
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

text_enum!(Language { En => "en", Es => "es" });

impl Language {
    /// Anything that is not Spanish is served in English.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("es") {
            Language::Es
        } else {
            Language::En
        }
    }

    pub fn is_spanish(&self) -> bool {
        matches!(self, Language::Es)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatPreference {
    Window,
    Aisle,
    Middle,
}

text_enum!(SeatPreference { Window => "window", Aisle => "aisle", Middle => "middle" });

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Masked<String>,
    pub phone: Option<Masked<String>>,
    pub aadvantage_number: Option<String>,
    #[serde(rename = "language_preference", default)]
    pub language: Language,
    pub seat_preference: Option<SeatPreference>,
}

impl Passenger {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// Flights & Reservations
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    #[default]
    Scheduled,
    Delayed,
    Cancelled,
    Boarding,
    Departed,
}

text_enum!(FlightStatus {
    Scheduled => "scheduled",
    Delayed => "delayed",
    Cancelled => "cancelled",
    Boarding => "boarding",
    Departed => "departed",
});

impl FlightStatus {
    /// Irregular operations: the states that trigger re-accommodation.
    pub fn is_disruption(&self) -> bool {
        matches!(self, FlightStatus::Delayed | FlightStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub status: FlightStatus,
}

impl Flight {
    pub fn origin_city(&self) -> &str {
        crate::airports::city_name(&self.origin)
    }

    pub fn destination_city(&self) -> &str {
        crate::airports::city_name(&self.destination)
    }

    pub fn minutes_until_departure(&self, now: DateTime<Utc>) -> i64 {
        (self.departure_time - now).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSegment {
    pub id: Uuid,
    pub flight: Flight,
    pub seat: Option<String>,
    pub segment_order: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Confirmed,
    Changed,
    Cancelled,
}

text_enum!(ReservationStatus {
    Confirmed => "confirmed",
    Changed => "changed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub confirmation_code: String,
    pub passenger: Passenger,
    pub segments: Vec<FlightSegment>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Segments are kept ordered by `segment_order`.
    pub fn sort_segments(&mut self) {
        self.segments.sort_by_key(|s| s.segment_order);
    }

    pub fn first_segment(&self) -> Option<&FlightSegment> {
        self.segments.iter().min_by_key(|s| s.segment_order)
    }

    pub fn first_flight(&self) -> Option<&Flight> {
        self.first_segment().map(|s| &s.flight)
    }

    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Wire shape of a reservation as the web and mobile clients consume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationView {
    pub id: Uuid,
    pub confirmation_code: String,
    pub passenger: Passenger,
    pub flights: Vec<SegmentView>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentView {
    pub id: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub status: FlightStatus,
    pub seat: Option<String>,
}

impl SegmentView {
    pub fn of(flight: &Flight, seat: Option<String>) -> Self {
        Self {
            id: flight.id.clone(),
            flight_number: flight.flight_number.clone(),
            origin: flight.origin.clone(),
            destination: flight.destination.clone(),
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            gate: flight.gate.clone(),
            status: flight.status,
            seat,
        }
    }
}

impl From<&Reservation> for ReservationView {
    fn from(r: &Reservation) -> Self {
        let mut segments: Vec<&FlightSegment> = r.segments.iter().collect();
        segments.sort_by_key(|s| s.segment_order);

        Self {
            id: r.id,
            confirmation_code: r.confirmation_code.clone(),
            passenger: r.passenger.clone(),
            flights: segments
                .into_iter()
                .map(|s| SegmentView::of(&s.flight, s.seat.clone()))
                .collect(),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

// ============================================================================
// Sessions & Messages
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Greeting,
    Lookup,
    Viewing,
    Changing,
    Confirming,
    Complete,
}

text_enum!(SessionState {
    Greeting => "greeting",
    Lookup => "lookup",
    Viewing => "viewing",
    Changing => "changing",
    Confirming => "confirming",
    Complete => "complete",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    pub reservation_id: Option<Uuid>,
    pub helper_link: Option<String>,
    pub call_id: Option<String>,
    pub context: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Greeting,
            reservation_id: None,
            helper_link: None,
            call_id: None,
            context: json!({}),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }

    pub fn set_context(&mut self, key: &str, value: Value) {
        if !self.context.is_object() {
            self.context = json!({});
        }
        if let Some(map) = self.context.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    pub fn remove_context(&mut self, key: &str) -> Option<Value> {
        self.context.as_object_mut().and_then(|m| m.remove(key))
    }

    /// Language the passenger last spoke, recorded by the conversation engine.
    pub fn language(&self) -> Option<Language> {
        self.context_str("language").map(Language::from_code)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Agent,
    Family,
}

text_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
    Agent => "agent",
    Family => "family",
});

/// Transcript entry. Messages are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(skip_serializing)]
    #[serde(default = "Uuid::nil")]
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub audio_url: Option<String>,
    pub intent: Option<String>,
    pub entities: Value,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(session_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.into(),
            audio_url: None,
            intent: None,
            entities: json!({}),
            timestamp: Utc::now(),
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>, entities: Value) -> Self {
        self.intent = Some(intent.into());
        self.entities = entities;
        self
    }

    pub fn with_audio(mut self, audio_url: Option<String>) -> Self {
        self.audio_url = audio_url;
        self
    }
}

// ============================================================================
// Family actions
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FamilyActionType {
    ChangeFlight,
    CancelFlight,
    SelectSeat,
    AddBags,
    RequestWheelchair,
}

text_enum!(FamilyActionType {
    ChangeFlight => "change_flight",
    CancelFlight => "cancel_flight",
    SelectSeat => "select_seat",
    AddBags => "add_bags",
    RequestWheelchair => "request_wheelchair",
});

impl FamilyActionType {
    pub const ALL: [FamilyActionType; 5] = [
        FamilyActionType::ChangeFlight,
        FamilyActionType::CancelFlight,
        FamilyActionType::SelectSeat,
        FamilyActionType::AddBags,
        FamilyActionType::RequestWheelchair,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            FamilyActionType::ChangeFlight => "Change Flight",
            FamilyActionType::CancelFlight => "Cancel Flight",
            FamilyActionType::SelectSeat => "Select Seat",
            FamilyActionType::AddBags => "Add Baggage",
            FamilyActionType::RequestWheelchair => "Request Wheelchair",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FamilyActionType::ChangeFlight => "Select a new flight from available alternatives",
            FamilyActionType::CancelFlight => "Cancel the reservation",
            FamilyActionType::SelectSeat => "Choose a seat from available options",
            FamilyActionType::AddBags => "Add checked bags to the reservation",
            FamilyActionType::RequestWheelchair => "Request wheelchair assistance",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FamilyActionType::ChangeFlight => "plane",
            FamilyActionType::CancelFlight => "x-circle",
            FamilyActionType::SelectSeat => "armchair",
            FamilyActionType::AddBags => "briefcase",
            FamilyActionType::RequestWheelchair => "accessibility",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Executed,
    Failed,
}

text_enum!(ActionStatus { Executed => "executed", Failed => "failed" });

/// Audit record of something a family member did through a helper link.
/// `action_type` stays free text so that rejected, unknown types are recorded too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyAction {
    pub id: Uuid,
    pub session_id: Uuid,
    pub action_type: String,
    pub action_data: Value,
    pub status: ActionStatus,
    pub family_notes: String,
    pub result_message: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Location tracking
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerLocation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PassengerLocation {
    pub fn new(session_id: Uuid, latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            latitude,
            longitude,
            accuracy,
            timestamp: Utc::now(),
        }
    }

    pub fn coordinate(&self) -> crate::geo::Coordinate {
        crate::geo::Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    RunningLate,
    Urgent,
    OffCourse,
    Arrived,
}

text_enum!(AlertType {
    RunningLate => "running_late",
    Urgent => "urgent",
    OffCourse => "off_course",
    Arrived => "arrived",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationAlert {
    pub id: Uuid,
    pub session_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub distance_to_gate: Option<f64>,
    pub estimated_walking_time: Option<i64>,
    pub time_to_departure: Option<i64>,
    pub acknowledged: bool,
    pub voice_call_sent: bool,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Handoff
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandoffStatus {
    Pending,
    Accepted,
    Resolved,
}

text_enum!(HandoffStatus {
    Pending => "pending",
    Accepted => "accepted",
    Resolved => "resolved",
});

impl HandoffStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, HandoffStatus::Resolved)
    }
}

/// Declaration order is urgency order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HandoffPriority {
    Low,
    Medium,
    High,
    Urgent,
}

text_enum!(HandoffPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Everything a human agent needs to pick up a conversation cold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffDossier {
    pub id: Uuid,
    pub session_id: Uuid,
    pub status: HandoffStatus,
    pub priority: HandoffPriority,
    pub sentiment_score: f64,
    pub reason: String,
    pub summary: String,
    pub metadata: Value,
    pub transcript: Vec<Message>,
    pub assigned_agent: Option<String>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
