use chrono::{Duration, Utc};
use concierge_core::demo::{demo_reservation, demo_reservation_for, demo_reservations};
use concierge_core::models::{Flight, Reservation, ReservationStatus, SessionState};
use concierge_core::search::FlightOption;
use tracing::info;
use uuid::Uuid;

use crate::context::TripContext;
use crate::error::{TripError, TripResult};
use crate::flights::FlightCatalog;

/// Result of moving a reservation onto a new flight.
#[derive(Debug, Clone)]
pub struct FlightChange {
    pub reservation: Reservation,
    pub original: Flight,
    pub new: Flight,
}

#[derive(Clone)]
pub struct ReservationService {
    ctx: TripContext,
}

impl ReservationService {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Stored reservation for a code, materialising demo bookings on first use.
    pub async fn find_by_code(&self, code: &str) -> TripResult<Option<Reservation>> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Ok(None);
        }
        if let Some(reservation) = self.ctx.store.find_by_code(&code).await? {
            return Ok(Some(reservation));
        }
        match demo_reservation(&code, Utc::now()) {
            Some(reservation) => {
                self.ctx.store.save_reservation(&reservation).await?;
                info!(code = %reservation.confirmation_code, "Materialised demo reservation");
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: Uuid) -> TripResult<Option<Reservation>> {
        Ok(self.ctx.store.get_reservation(id).await?)
    }

    /// Lookup by confirmation code, else by passenger last name or email.
    pub async fn lookup(
        &self,
        code: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> TripResult<Reservation> {
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        let last_name = last_name.map(str::trim).filter(|n| !n.is_empty());
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if code.is_none() && last_name.is_none() && email.is_none() {
            return Err(TripError::validation("confirmation_code, last_name, or email is required"));
        }

        if let Some(code) = code {
            if let Some(reservation) = self.find_by_code(code).await? {
                return Ok(reservation);
            }
        }

        if last_name.is_some() || email.is_some() {
            if let Some(reservation) = self.ctx.store.find_by_passenger(last_name, email).await? {
                return Ok(reservation);
            }
            if let Some(demo) = demo_reservation_for(last_name, email, Utc::now()) {
                if let Some(reservation) = self.find_by_code(&demo.confirmation_code).await? {
                    return Ok(reservation);
                }
            }
        }

        Err(TripError::not_found("Reservation not found"))
    }

    /// Moves the reservation of a session onto `new_flight_id` and completes the session.
    pub async fn change(
        &self,
        session_id: Uuid,
        reservation_id: Uuid,
        new_flight_id: &str,
    ) -> TripResult<FlightChange> {
        let not_found = || TripError::not_found("Session or reservation not found");
        let mut session = self.ctx.store.get_session(session_id).await?.ok_or_else(not_found)?;
        let reservation = self.ctx.store.get_reservation(reservation_id).await?.ok_or_else(not_found)?;

        let option = self
            .resolve_option(&reservation, new_flight_id)
            .await?
            .ok_or_else(|| TripError::not_found("Flight not found"))?;
        let change = self.apply_option(reservation, &option).await?;

        session.reservation_id = Some(change.reservation.id);
        session.remove_context("pending_flight");
        self.ctx.transition(&mut session, SessionState::Complete);
        self.ctx.store.save_session(&session).await?;
        Ok(change)
    }

    /// Finds an offered flight by id or number: stored flights first, then the
    /// alternatives for the day after the current departure.
    pub async fn resolve_option(
        &self,
        reservation: &Reservation,
        id_or_number: &str,
    ) -> TripResult<Option<FlightOption>> {
        let Some(current) = reservation.first_flight() else {
            return Ok(None);
        };
        if let Some(flight) = self.ctx.store.get_flight(id_or_number).await? {
            return Ok(Some(option_from_flight(&flight)));
        }
        let next_day = (current.departure_time + Duration::days(1)).date_naive();
        Ok(FlightCatalog::new(self.ctx.clone())
            .find_option(&current.origin, &current.destination, next_day, id_or_number)
            .await)
    }

    /// Replaces the first segment's flight and marks the reservation changed.
    pub async fn apply_option(&self, mut reservation: Reservation, option: &FlightOption) -> TripResult<FlightChange> {
        let new = option.to_flight();
        let segment = reservation
            .segments
            .iter_mut()
            .min_by_key(|s| s.segment_order)
            .ok_or_else(|| TripError::not_found("No flight segment found"))?;
        let original = std::mem::replace(&mut segment.flight, new.clone());

        reservation.status = ReservationStatus::Changed;
        reservation.touch();
        self.ctx.store.save_flight(&new).await?;
        self.ctx.store.save_reservation(&reservation).await?;

        info!(
            code = %reservation.confirmation_code,
            from = %original.flight_number,
            to = %new.flight_number,
            "Reservation moved to new flight"
        );
        Ok(FlightChange { reservation, original, new })
    }

    /// Stores the demo bookings that are not stored yet.
    pub async fn seed_demo(&self) -> TripResult<usize> {
        let mut seeded = 0;
        for reservation in demo_reservations(Utc::now()) {
            if self.ctx.store.find_by_code(&reservation.confirmation_code).await?.is_none() {
                self.ctx.store.save_reservation(&reservation).await?;
                seeded += 1;
            }
        }
        info!(seeded, "Demo reservations ready");
        Ok(seeded)
    }
}

fn option_from_flight(flight: &Flight) -> FlightOption {
    let minutes = (flight.arrival_time - flight.departure_time).num_minutes();
    FlightOption {
        id: flight.id.clone(),
        flight_number: flight.flight_number.clone(),
        origin: flight.origin.clone(),
        destination: flight.destination.clone(),
        departure_time: flight.departure_time,
        arrival_time: flight.arrival_time,
        gate: flight.gate.clone().unwrap_or_else(|| "TBD".to_string()),
        status: flight.status,
        duration: format!("{}h {}m", minutes / 60, minutes % 60),
        aircraft: None,
        distance_miles: None,
        origin_city: flight.origin_city().to_string(),
        destination_city: flight.destination_city().to_string(),
    }
}
