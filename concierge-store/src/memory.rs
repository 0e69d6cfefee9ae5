//! In-process store and cache. Backs the test suite and database-less demo runs.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::models::{
    AlertType, FamilyAction, Flight, HandoffDossier, HandoffStatus, LocationAlert, Message,
    PassengerLocation, Reservation, Session,
};
use concierge_core::providers::KeyValueCache;
use concierge_core::repository::{
    ActivityRepository, ConciergeStore, HandoffRepository, ReservationRepository,
    SessionRepository,
};
use concierge_core::{CoreError, CoreResult};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    reservations: RwLock<HashMap<Uuid, Reservation>>,
    flights: RwLock<HashMap<String, Flight>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    messages: RwLock<HashMap<Uuid, Vec<Message>>>,
    actions: RwLock<HashMap<Uuid, Vec<FamilyAction>>>,
    locations: RwLock<HashMap<Uuid, Vec<PassengerLocation>>>,
    alerts: RwLock<HashMap<Uuid, LocationAlert>>,
    dossiers: RwLock<HashMap<Uuid, HandoffDossier>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flights live in their own table; segments pick up the latest copy on read.
    async fn hydrate(&self, mut reservation: Reservation) -> Reservation {
        let flights = self.flights.read().await;
        for segment in &mut reservation.segments {
            if let Some(current) = flights.get(&segment.flight.id) {
                segment.flight = current.clone();
            }
        }
        reservation.sort_segments();
        reservation
    }

    async fn hydrate_all(&self, reservations: Vec<Reservation>) -> Vec<Reservation> {
        let mut out = Vec::with_capacity(reservations.len());
        for r in reservations {
            out.push(self.hydrate(r).await);
        }
        out
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn save_reservation(&self, reservation: &Reservation) -> CoreResult<()> {
        let mut reservations = self.reservations.write().await;
        let clash = reservations.values().any(|r| {
            r.id != reservation.id
                && r.confirmation_code.eq_ignore_ascii_case(&reservation.confirmation_code)
        });
        if clash {
            return Err(CoreError::ValidationError(format!(
                "Confirmation code already exists: {}",
                reservation.confirmation_code
            )));
        }

        let mut flights = self.flights.write().await;
        for segment in &reservation.segments {
            flights.insert(segment.flight.id.clone(), segment.flight.clone());
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let found = self.reservations.read().await.get(&id).cloned();
        match found {
            Some(r) => Ok(Some(self.hydrate(r).await)),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, code: &str) -> CoreResult<Option<Reservation>> {
        let code = code.trim();
        let found = self
            .reservations
            .read()
            .await
            .values()
            .find(|r| r.confirmation_code.eq_ignore_ascii_case(code))
            .cloned();
        match found {
            Some(r) => Ok(Some(self.hydrate(r).await)),
            None => Ok(None),
        }
    }

    async fn find_by_passenger(
        &self,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> CoreResult<Option<Reservation>> {
        let found = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| {
                last_name.is_some_and(|n| r.passenger.last_name.eq_ignore_ascii_case(n.trim()))
                    || email.is_some_and(|e| r.passenger.email.expose().eq_ignore_ascii_case(e.trim()))
            })
            .min_by_key(|r| r.created_at)
            .cloned();
        match found {
            Some(r) => Ok(Some(self.hydrate(r).await)),
            None => Ok(None),
        }
    }

    async fn reservations_on_flight(&self, flight_id: &str) -> CoreResult<Vec<Reservation>> {
        let matching: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.segments.iter().any(|s| s.flight.id == flight_id))
            .cloned()
            .collect();
        Ok(self.hydrate_all(matching).await)
    }

    async fn reservations_departing_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Reservation>> {
        let all: Vec<Reservation> = self.reservations.read().await.values().cloned().collect();
        let hydrated = self.hydrate_all(all).await;
        Ok(hydrated
            .into_iter()
            .filter(|r| {
                r.segments
                    .iter()
                    .any(|s| s.flight.departure_time >= from && s.flight.departure_time <= to)
            })
            .collect())
    }

    async fn get_flight(&self, flight_id: &str) -> CoreResult<Option<Flight>> {
        Ok(self.flights.read().await.get(flight_id).cloned())
    }

    async fn save_flight(&self, flight: &Flight) -> CoreResult<()> {
        self.flights.write().await.insert(flight.id.clone(), flight.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn save_session(&self, session: &Session) -> CoreResult<()> {
        let mut sessions = self.sessions.write().await;
        if claimed_elsewhere(&sessions, session, |s| s.call_id.as_deref()) {
            return Err(CoreError::ValidationError("Duplicate record: call_id".to_string()));
        }
        if claimed_elsewhere(&sessions, session, |s| s.helper_link.as_deref()) {
            return Err(CoreError::ValidationError("Duplicate record: helper_link".to_string()));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> CoreResult<Option<Session>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn find_by_helper_link(&self, link: &str) -> CoreResult<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.helper_link.as_deref() == Some(link))
            .cloned())
    }

    async fn find_by_call_id(&self, call_id: &str) -> CoreResult<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.call_id.as_deref() == Some(call_id))
            .cloned())
    }

    async fn sessions_for_reservation(&self, reservation_id: Uuid) -> CoreResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.reservation_id == Some(reservation_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn append_message(&self, message: &Message) -> CoreResult<()> {
        self.messages
            .write()
            .await
            .entry(message.session_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> CoreResult<Vec<Message>> {
        let mut messages = self
            .messages
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default();
        // Stable: equal timestamps keep insertion order
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

#[async_trait]
impl ActivityRepository for InMemoryStore {
    async fn record_action(&self, action: &FamilyAction) -> CoreResult<()> {
        self.actions
            .write()
            .await
            .entry(action.session_id)
            .or_default()
            .push(action.clone());
        Ok(())
    }

    async fn list_actions(&self, session_id: Uuid) -> CoreResult<Vec<FamilyAction>> {
        let mut actions = self.actions.read().await.get(&session_id).cloned().unwrap_or_default();
        actions.reverse();
        Ok(actions)
    }

    async fn record_location(&self, location: &PassengerLocation) -> CoreResult<()> {
        self.locations
            .write()
            .await
            .entry(location.session_id)
            .or_default()
            .push(location.clone());
        Ok(())
    }

    async fn latest_location(&self, session_id: Uuid) -> CoreResult<Option<PassengerLocation>> {
        Ok(self
            .locations
            .read()
            .await
            .get(&session_id)
            .and_then(|points| points.last().cloned()))
    }

    async fn save_alert(&self, alert: &LocationAlert) -> CoreResult<()> {
        self.alerts.write().await.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn latest_alert(
        &self,
        session_id: Uuid,
        alert_type: AlertType,
    ) -> CoreResult<Option<LocationAlert>> {
        Ok(self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| a.session_id == session_id && a.alert_type == alert_type)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn latest_unacknowledged_alert(&self, session_id: Uuid) -> CoreResult<Option<LocationAlert>> {
        Ok(self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| a.session_id == session_id && !a.acknowledged)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn acknowledge_alert(&self, alert_id: Uuid) -> CoreResult<bool> {
        match self.alerts.write().await.get_mut(&alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl HandoffRepository for InMemoryStore {
    async fn save_dossier(&self, dossier: &HandoffDossier) -> CoreResult<()> {
        self.dossiers.write().await.insert(dossier.id, dossier.clone());
        Ok(())
    }

    async fn get_dossier(&self, id: Uuid) -> CoreResult<Option<HandoffDossier>> {
        Ok(self.dossiers.read().await.get(&id).cloned())
    }

    async fn open_dossier_for_session(&self, session_id: Uuid) -> CoreResult<Option<HandoffDossier>> {
        Ok(self
            .dossiers
            .read()
            .await
            .values()
            .find(|d| d.session_id == session_id && d.status.is_open())
            .cloned())
    }

    async fn list_dossiers(&self, status: Option<HandoffStatus>) -> CoreResult<Vec<HandoffDossier>> {
        Ok(self
            .dossiers
            .read()
            .await
            .values()
            .filter(|d| status.is_none_or(|s| d.status == s))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConciergeStore for InMemoryStore {
    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Default)]
pub struct InMemoryCache {
    values: RwLock<HashMap<String, (String, Instant)>>,
    counters: RwLock<HashMap<String, (i64, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let values = self.values.read().await;
        Ok(values
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(v, _)| v.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CoreResult<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        self.values.write().await.insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CoreResult<bool> {
        let now = Instant::now();
        let mut values = self.values.write().await;
        if values.get(key).is_some_and(|(_, expires)| *expires > now) {
            return Ok(false);
        }
        values.insert(key.to_string(), (value.to_string(), now + Duration::from_secs(ttl_seconds)));
        Ok(true)
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> CoreResult<bool> {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        let entry = counters
            .entry(key.to_string())
            .or_insert((0, now + Duration::from_secs(window_seconds.max(1) as u64)));
        if entry.1 <= now {
            *entry = (0, now + Duration::from_secs(window_seconds.max(1) as u64));
        }
        entry.0 += 1;
        Ok(entry.0 <= limit)
    }
}

/// Whether another session already holds the unique key `pick` reads.
fn claimed_elsewhere(
    sessions: &HashMap<Uuid, Session>,
    session: &Session,
    pick: fn(&Session) -> Option<&str>,
) -> bool {
    pick(session).is_some_and(|value| {
        sessions.values().any(|s| s.id != session.id && pick(s) == Some(value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use concierge_core::demo::demo_reservation;
    use concierge_core::models::{FlightStatus, MessageRole};

    #[tokio::test]
    async fn test_reservation_lookup_and_flight_refresh() {
        let store = InMemoryStore::new();
        let reservation = demo_reservation("DEMO123", Utc::now()).unwrap();
        store.save_reservation(&reservation).await.unwrap();

        let found = store.find_by_code("demo123").await.unwrap().unwrap();
        assert_eq!(found.id, reservation.id);

        let mut flight = found.first_flight().unwrap().clone();
        flight.status = FlightStatus::Delayed;
        store.save_flight(&flight).await.unwrap();

        let refreshed = store.get_reservation(reservation.id).await.unwrap().unwrap();
        assert_eq!(refreshed.first_flight().unwrap().status, FlightStatus::Delayed);

        let on_flight = store.reservations_on_flight(&flight.id).await.unwrap();
        assert_eq!(on_flight.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_confirmation_code_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.save_reservation(&demo_reservation("DEMO123", now).unwrap()).await.unwrap();
        let again = demo_reservation("DEMO123", now).unwrap();
        assert!(store.save_reservation(&again).await.is_err());
    }

    #[tokio::test]
    async fn test_departure_window_query() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.save_reservation(&demo_reservation("SENIOR2", now).unwrap()).await.unwrap();

        // SENIOR2 departs in 1 day 8 hours
        let hit = store
            .reservations_departing_between(now + ChronoDuration::hours(31), now + ChronoDuration::hours(33))
            .await
            .unwrap();
        assert_eq!(hit.len(), 1);
        let miss = store
            .reservations_departing_between(now, now + ChronoDuration::hours(2))
            .await
            .unwrap();
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn test_session_call_id_and_link_are_unique() {
        let store = InMemoryStore::new();
        let mut first = Session::new(ChronoDuration::minutes(30));
        first.call_id = Some("call_1".to_string());
        first.helper_link = Some("link-1".to_string());
        store.save_session(&first).await.unwrap();
        // resaving the same session is fine
        store.save_session(&first).await.unwrap();

        let mut second = Session::new(ChronoDuration::minutes(30));
        second.call_id = Some("call_1".to_string());
        assert!(matches!(store.save_session(&second).await, Err(CoreError::ValidationError(_))));

        second.call_id = Some("call_2".to_string());
        second.helper_link = Some("link-1".to_string());
        assert!(matches!(store.save_session(&second).await, Err(CoreError::ValidationError(_))));

        second.helper_link = None;
        store.save_session(&second).await.unwrap();
        assert_eq!(store.find_by_call_id("call_1").await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_messages_are_ordered() {
        let store = InMemoryStore::new();
        let session = Session::new(ChronoDuration::minutes(30));
        store.save_session(&session).await.unwrap();

        store.append_message(&Message::new(session.id, MessageRole::User, "hello")).await.unwrap();
        store.append_message(&Message::new(session.id, MessageRole::Assistant, "hi")).await.unwrap();

        let messages = store.list_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_cache_nx_and_rate_limit() {
        let cache = InMemoryCache::new();
        assert!(cache.set_nx_ex("reminder:1", "1", 60).await.unwrap());
        assert!(!cache.set_nx_ex("reminder:1", "1", 60).await.unwrap());
        assert_eq!(cache.get("reminder:1").await.unwrap().as_deref(), Some("1"));

        assert!(cache.check_rate_limit("ratelimit:ip", 2, 60).await.unwrap());
        assert!(cache.check_rate_limit("ratelimit:ip", 2, 60).await.unwrap());
        assert!(!cache.check_rate_limit("ratelimit:ip", 2, 60).await.unwrap());
    }
}
