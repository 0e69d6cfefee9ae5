use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AlertType, FamilyAction, Flight, HandoffDossier, HandoffStatus, LocationAlert, Message,
    PassengerLocation, Reservation, Session,
};
use crate::CoreResult;

/// Reservation, passenger and flight data access
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert or replace a reservation together with its passenger, segments and flights.
    async fn save_reservation(&self, reservation: &Reservation) -> CoreResult<()>;

    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>>;

    /// Case-insensitive confirmation code lookup.
    async fn find_by_code(&self, code: &str) -> CoreResult<Option<Reservation>>;

    /// First reservation whose passenger matches the last name and/or email (case-insensitive).
    async fn find_by_passenger(
        &self,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> CoreResult<Option<Reservation>>;

    async fn reservations_on_flight(&self, flight_id: &str) -> CoreResult<Vec<Reservation>>;

    /// Reservations with at least one segment departing in `[from, to]`.
    async fn reservations_departing_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Reservation>>;

    async fn get_flight(&self, flight_id: &str) -> CoreResult<Option<Flight>>;

    async fn save_flight(&self, flight: &Flight) -> CoreResult<()>;
}

/// Conversation sessions and their transcripts
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save_session(&self, session: &Session) -> CoreResult<()>;

    async fn get_session(&self, id: Uuid) -> CoreResult<Option<Session>>;

    async fn find_by_helper_link(&self, link: &str) -> CoreResult<Option<Session>>;

    async fn find_by_call_id(&self, call_id: &str) -> CoreResult<Option<Session>>;

    async fn sessions_for_reservation(&self, reservation_id: Uuid) -> CoreResult<Vec<Session>>;

    async fn append_message(&self, message: &Message) -> CoreResult<()>;

    /// Oldest first.
    async fn list_messages(&self, session_id: Uuid) -> CoreResult<Vec<Message>>;
}

/// Family actions, passenger positions and location alerts
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record_action(&self, action: &FamilyAction) -> CoreResult<()>;

    /// Newest first.
    async fn list_actions(&self, session_id: Uuid) -> CoreResult<Vec<FamilyAction>>;

    async fn record_location(&self, location: &PassengerLocation) -> CoreResult<()>;

    async fn latest_location(&self, session_id: Uuid) -> CoreResult<Option<PassengerLocation>>;

    async fn save_alert(&self, alert: &LocationAlert) -> CoreResult<()>;

    /// Most recent alert of a type, acknowledged or not.
    async fn latest_alert(
        &self,
        session_id: Uuid,
        alert_type: AlertType,
    ) -> CoreResult<Option<LocationAlert>>;

    async fn latest_unacknowledged_alert(&self, session_id: Uuid) -> CoreResult<Option<LocationAlert>>;

    /// Returns false when the alert does not exist.
    async fn acknowledge_alert(&self, alert_id: Uuid) -> CoreResult<bool>;
}

/// Handoff dossiers for the agent console
#[async_trait]
pub trait HandoffRepository: Send + Sync {
    async fn save_dossier(&self, dossier: &HandoffDossier) -> CoreResult<()>;

    async fn get_dossier(&self, id: Uuid) -> CoreResult<Option<HandoffDossier>>;

    /// The pending or accepted dossier of a session, if any.
    async fn open_dossier_for_session(&self, session_id: Uuid) -> CoreResult<Option<HandoffDossier>>;

    async fn list_dossiers(&self, status: Option<HandoffStatus>) -> CoreResult<Vec<HandoffDossier>>;
}

/// The full persistence surface, implemented by the Postgres and in-memory stores.
#[async_trait]
pub trait ConciergeStore:
    ReservationRepository + SessionRepository + ActivityRepository + HandoffRepository
{
    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> CoreResult<()>;
}
