use chrono::{DateTime, Utc};
use concierge_core::airports::{self, directions, gate_location};
use concierge_core::geo::{walking_minutes, Coordinate, WalkingPace};
use concierge_core::models::{AlertType, PassengerLocation};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::alerts::{AlertOutcome, LocationAlerts};
use crate::context::TripContext;
use crate::error::{TripError, TripResult};

/// Smaller moves than this are not stored.
const MIN_MOVEMENT_M: f64 = 50.0;
const GATE_ARRIVAL_M: f64 = 100.0;
/// Walking time past `departure - SAFE_BUFFER` is a warning.
const SAFE_BUFFER_MIN: i64 = 30;
/// Walking time past `departure - WARNING_BUFFER` is urgent. Gates close at this point.
pub const WARNING_BUFFER_MIN: i64 = 15;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Safe,
    Warning,
    Urgent,
    Arrived,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<&PassengerLocation> for PositionView {
    fn from(location: &PassengerLocation) -> Self {
        Self {
            lat: location.latitude,
            lng: location.longitude,
            accuracy: location.accuracy,
            timestamp: location.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GateView {
    pub lat: f64,
    pub lng: f64,
    pub gate: String,
    pub terminal: String,
    pub approximate: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub distance_meters: Option<i64>,
    pub walking_time_minutes: Option<i64>,
    pub time_to_departure_minutes: Option<i64>,
    pub alert_status: AlertStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the helper dashboard shows about where the passenger is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocationMetrics {
    pub passenger_location: Option<PositionView>,
    pub gate_location: Option<GateView>,
    pub metrics: Metrics,
    pub directions: String,
    pub message: String,
    pub alert: Option<AlertSummary>,
}

impl LocationMetrics {
    fn note(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationUpdate {
    /// False when the move was too small to keep.
    pub stored: bool,
    pub location: PositionView,
    pub metrics: LocationMetrics,
    pub alert: Option<AlertOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeofenceStatus {
    pub nearest_airport: Option<String>,
    pub airport_name: Option<String>,
    pub distance_km: Option<f64>,
    pub in_airport: bool,
}

#[derive(Clone)]
pub struct LocationTracker {
    ctx: TripContext,
}

impl LocationTracker {
    pub fn new(ctx: TripContext) -> Self {
        Self { ctx }
    }

    /// Records a GPS fix and raises an alert when the passenger is running late.
    pub async fn update(
        &self,
        session_id: Uuid,
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
    ) -> TripResult<LocationUpdate> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(TripError::validation("Invalid coordinates"));
        }
        let session = self.ctx.session(session_id).await?;

        let fix = PassengerLocation::new(session.id, latitude, longitude, accuracy);
        let last = self.ctx.store.latest_location(session.id).await?;
        let moved = last
            .as_ref()
            .map(|l| l.coordinate().distance_to(&fix.coordinate()))
            .unwrap_or(f64::INFINITY);

        let stored = moved >= MIN_MOVEMENT_M;
        if stored {
            self.ctx.store.record_location(&fix).await?;
            info!(session_id = %session.id, "Passenger location stored");
        } else {
            debug!(session_id = %session.id, moved_m = moved, "Location change below threshold");
        }

        let metrics = self.metrics(session.id).await?;
        let alert = LocationAlerts::new(self.ctx.clone()).check_and_send(session.id, &metrics).await?;

        Ok(LocationUpdate {
            stored,
            location: PositionView::from(&fix),
            metrics,
            alert,
        })
    }

    pub async fn current(&self, session_id: Uuid) -> TripResult<Option<PositionView>> {
        Ok(self.ctx.store.latest_location(session_id).await?.as_ref().map(PositionView::from))
    }

    /// Distance, walking time and alert status toward the first segment's gate.
    /// Missing pieces are reported in `message`, not as errors.
    pub async fn metrics(&self, session_id: Uuid) -> TripResult<LocationMetrics> {
        self.metrics_at(session_id, Utc::now()).await
    }

    pub(crate) async fn metrics_at(&self, session_id: Uuid, now: DateTime<Utc>) -> TripResult<LocationMetrics> {
        let mut out = LocationMetrics::default();
        let Some(session) = self.ctx.store.get_session(session_id).await? else {
            return Ok(out.note("Session not found"));
        };

        let latest = self.ctx.store.latest_location(session.id).await?;
        out.passenger_location = latest.as_ref().map(PositionView::from);
        out.alert = self
            .ctx
            .store
            .latest_unacknowledged_alert(session.id)
            .await?
            .map(|a| AlertSummary { id: a.id, alert_type: a.alert_type, message: a.message, created_at: a.created_at });

        let reservation = match session.reservation_id {
            Some(id) => self.ctx.store.get_reservation(id).await?,
            None => None,
        };
        let segment = reservation.as_ref().and_then(|r| r.first_segment());
        let gate = segment.and_then(|s| {
            let gate = s.flight.gate.as_deref()?;
            gate_location(&s.flight.origin, gate).map(|g| GateView {
                lat: g.coordinate.latitude,
                lng: g.coordinate.longitude,
                gate: gate.to_string(),
                terminal: g.terminal,
                approximate: g.approximate,
            })
        });
        out.gate_location = gate.clone();

        let Some(position) = latest else {
            return Ok(out.note("No location data available"));
        };
        let Some(segment) = segment else {
            let message = if reservation.is_some() { "Flight information not available" } else { "Gate information not available" };
            return Ok(out.note(message));
        };
        let Some(gate) = gate else {
            return Ok(out.note("Gate information not available"));
        };

        let here = position.coordinate();
        let distance = here.distance_to(&Coordinate::new(gate.lat, gate.lng));
        let walking = walking_minutes(distance, WalkingPace::Elderly);
        let time_to_departure = segment.flight.minutes_until_departure(now).max(0);

        let (status, message) = if distance <= GATE_ARRIVAL_M {
            (AlertStatus::Arrived, format!("You've arrived at gate {}!", gate.gate))
        } else if walking > time_to_departure - WARNING_BUFFER_MIN {
            (
                AlertStatus::Urgent,
                format!(
                    "Urgent: You may miss your flight! Gate closes in {} minutes.",
                    time_to_departure - WARNING_BUFFER_MIN
                ),
            )
        } else if walking > time_to_departure - SAFE_BUFFER_MIN {
            (AlertStatus::Warning, format!("Please head to your gate now. It's about {} minutes away.", walking))
        } else {
            (
                AlertStatus::Safe,
                format!("You have plenty of time. Gate {} is about {} minutes away.", gate.gate, walking),
            )
        };

        let language = reservation.as_ref().map(|r| r.passenger.language).unwrap_or_default();
        out.metrics = Metrics {
            distance_meters: Some(distance.round() as i64),
            walking_time_minutes: Some(walking),
            time_to_departure_minutes: Some(time_to_departure),
            alert_status: status,
        };
        out.directions = directions(&here, &segment.flight.origin, &gate.gate, language);
        out.message = message;
        Ok(out)
    }
}

/// Which airport, if any, a position is at.
pub fn geofence_status(latitude: f64, longitude: f64, airport: Option<&str>) -> GeofenceStatus {
    let here = Coordinate::new(latitude, longitude);
    let nearest = airports::nearest_airport(&here);
    let in_airport = match (airport, nearest) {
        (Some(code), _) => airports::is_in_airport(&here, code),
        (None, Some((fence, _))) => airports::is_in_airport(&here, fence.code),
        (None, None) => false,
    };
    GeofenceStatus {
        nearest_airport: nearest.map(|(f, _)| f.code.to_string()),
        airport_name: nearest.map(|(f, _)| f.name.to_string()),
        distance_km: nearest.map(|(_, km)| (km * 100.0).round() / 100.0),
        in_airport,
    }
}
