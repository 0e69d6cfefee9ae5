use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::models::{
    AlertType, FamilyAction, Flight, FlightSegment, HandoffDossier, HandoffStatus, LocationAlert,
    Message, Passenger, PassengerLocation, Reservation, Session,
};
use concierge_core::repository::{
    ActivityRepository, ConciergeStore, HandoffRepository, ReservationRepository,
    SessionRepository,
};
use concierge_core::{CoreError, CoreResult};
use concierge_shared::Masked;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }
}

fn db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return CoreError::ValidationError(format!("Duplicate record: {}", db.message()));
        }
    }
    CoreError::StorageError(err.to_string())
}

fn decode_json<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> CoreResult<T> {
    serde_json::from_value(value)
        .map_err(|e| CoreError::StorageError(format!("Corrupt {} column: {}", what, e)))
}

// Row types
#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    confirmation_code: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    passenger_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    aadvantage_number: Option<String>,
    language_preference: String,
    seat_preference: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SegmentRow {
    segment_id: Uuid,
    seat: Option<String>,
    segment_order: i32,
    #[sqlx(flatten)]
    flight: FlightRow,
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: String,
    flight_number: String,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    gate: Option<String>,
    status: String,
}

impl TryFrom<FlightRow> for Flight {
    type Error = CoreError;

    fn try_from(row: FlightRow) -> CoreResult<Self> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            gate: row.gate,
            status: row.status.parse()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    state: String,
    reservation_id: Option<Uuid>,
    helper_link: Option<String>,
    call_id: Option<String>,
    context: Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = CoreError;

    fn try_from(row: SessionRow) -> CoreResult<Self> {
        Ok(Session {
            id: row.id,
            state: row.state.parse()?,
            reservation_id: row.reservation_id,
            helper_link: row.helper_link,
            call_id: row.call_id,
            context: row.context,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    session_id: Uuid,
    role: String,
    content: String,
    audio_url: Option<String>,
    intent: Option<String>,
    entities: Value,
    timestamp: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = CoreError;

    fn try_from(row: MessageRow) -> CoreResult<Self> {
        Ok(Message {
            id: row.id,
            session_id: row.session_id,
            role: row.role.parse()?,
            content: row.content,
            audio_url: row.audio_url,
            intent: row.intent,
            entities: row.entities,
            timestamp: row.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActionRow {
    id: Uuid,
    session_id: Uuid,
    action_type: String,
    action_data: Value,
    status: String,
    family_notes: String,
    result_message: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: Uuid,
    session_id: Uuid,
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    session_id: Uuid,
    alert_type: String,
    message: String,
    distance_to_gate: Option<f64>,
    estimated_walking_time: Option<i64>,
    time_to_departure: Option<i64>,
    acknowledged: bool,
    voice_call_sent: bool,
    email_sent: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for LocationAlert {
    type Error = CoreError;

    fn try_from(row: AlertRow) -> CoreResult<Self> {
        Ok(LocationAlert {
            id: row.id,
            session_id: row.session_id,
            alert_type: row.alert_type.parse()?,
            message: row.message,
            distance_to_gate: row.distance_to_gate,
            estimated_walking_time: row.estimated_walking_time,
            time_to_departure: row.time_to_departure,
            acknowledged: row.acknowledged,
            voice_call_sent: row.voice_call_sent,
            email_sent: row.email_sent,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DossierRow {
    id: Uuid,
    session_id: Uuid,
    status: String,
    priority: String,
    sentiment_score: f64,
    reason: String,
    summary: String,
    metadata: Value,
    transcript: Value,
    assigned_agent: Option<String>,
    resolution_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DossierRow> for HandoffDossier {
    type Error = CoreError;

    fn try_from(row: DossierRow) -> CoreResult<Self> {
        let mut transcript: Vec<Message> = decode_json(row.transcript, "transcript")?;
        // session_id is not part of the stored message JSON
        for message in &mut transcript {
            message.session_id = row.session_id;
        }
        Ok(HandoffDossier {
            id: row.id,
            session_id: row.session_id,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            sentiment_score: row.sentiment_score,
            reason: row.reason,
            summary: row.summary,
            metadata: row.metadata,
            transcript,
            assigned_agent: row.assigned_agent,
            resolution_notes: row.resolution_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const RESERVATION_SELECT: &str = r#"
    SELECT r.id, r.confirmation_code, r.status, r.created_at, r.updated_at,
           p.id AS passenger_id, p.first_name, p.last_name, p.email, p.phone,
           p.aadvantage_number, p.language_preference, p.seat_preference
    FROM reservations r
    JOIN passengers p ON p.id = r.passenger_id
"#;

const SESSION_SELECT: &str = r#"
    SELECT id, state, reservation_id, helper_link, call_id, context, created_at, expires_at
    FROM sessions
"#;

const ALERT_SELECT: &str = r#"
    SELECT id, session_id, alert_type, message, distance_to_gate, estimated_walking_time,
           time_to_departure, acknowledged, voice_call_sent, email_sent, created_at
    FROM location_alerts
"#;

const DOSSIER_SELECT: &str = r#"
    SELECT id, session_id, status, priority, sentiment_score, reason, summary, metadata,
           transcript, assigned_agent, resolution_notes, created_at, updated_at
    FROM handoff_dossiers
"#;

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn assemble(&self, row: ReservationRow) -> CoreResult<Reservation> {
        let segment_rows = sqlx::query_as::<_, SegmentRow>(
            r#"
            SELECT s.id AS segment_id, s.seat, s.segment_order,
                   f.id, f.flight_number, f.origin, f.destination, f.departure_time,
                   f.arrival_time, f.gate, f.status
            FROM flight_segments s
            JOIN flights f ON f.id = s.flight_id
            WHERE s.reservation_id = $1
            ORDER BY s.segment_order
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let segments = segment_rows
            .into_iter()
            .map(|s| {
                Ok(FlightSegment {
                    id: s.segment_id,
                    flight: Flight::try_from(s.flight)?,
                    seat: s.seat,
                    segment_order: s.segment_order,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Reservation {
            id: row.id,
            confirmation_code: row.confirmation_code,
            passenger: Passenger {
                id: row.passenger_id,
                first_name: row.first_name,
                last_name: row.last_name,
                email: Masked::new(row.email),
                phone: row.phone.map(Masked::new),
                aadvantage_number: row.aadvantage_number,
                language: row.language_preference.parse()?,
                seat_preference: row.seat_preference.map(|s| s.parse()).transpose()?,
            },
            segments,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn load_many(&self, ids: Vec<Uuid>) -> CoreResult<Vec<Reservation>> {
        let mut reservations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(r) = self.get_reservation(id).await? {
                reservations.push(r);
            }
        }
        Ok(reservations)
    }
}

#[async_trait]
impl ReservationRepository for PgStore {
    async fn save_reservation(&self, reservation: &Reservation) -> CoreResult<()> {
        let passenger = &reservation.passenger;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO passengers (id, first_name, last_name, email, phone, aadvantage_number,
                                    language_preference, seat_preference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                aadvantage_number = EXCLUDED.aadvantage_number,
                language_preference = EXCLUDED.language_preference,
                seat_preference = EXCLUDED.seat_preference
            "#,
        )
        .bind(passenger.id)
        .bind(&passenger.first_name)
        .bind(&passenger.last_name)
        .bind(passenger.email.expose())
        .bind(passenger.phone.as_ref().map(|p| p.expose().clone()))
        .bind(&passenger.aadvantage_number)
        .bind(passenger.language.as_str())
        .bind(passenger.seat_preference.map(|s| s.as_str()))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for segment in &reservation.segments {
            upsert_flight(&mut tx, &segment.flight).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO reservations (id, confirmation_code, passenger_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                confirmation_code = EXCLUDED.confirmation_code,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.confirmation_code.to_uppercase())
        .bind(passenger.id)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("DELETE FROM flight_segments WHERE reservation_id = $1")
            .bind(reservation.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for segment in &reservation.segments {
            sqlx::query(
                r#"
                INSERT INTO flight_segments (id, reservation_id, flight_id, seat, segment_order)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(segment.id)
            .bind(reservation.id)
            .bind(&segment.flight.id)
            .bind(&segment.seat)
            .bind(segment.segment_order)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!("{} WHERE r.id = $1", RESERVATION_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, code: &str) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{} WHERE r.confirmation_code = UPPER($1)",
            RESERVATION_SELECT
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_passenger(
        &self,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> CoreResult<Option<Reservation>> {
        if last_name.is_none() && email.is_none() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"{}
            WHERE ($1::TEXT IS NOT NULL AND LOWER(p.last_name) = LOWER($1))
               OR ($2::TEXT IS NOT NULL AND LOWER(p.email) = LOWER($2))
            ORDER BY r.created_at
            LIMIT 1"#,
            RESERVATION_SELECT
        ))
        .bind(last_name.map(str::trim))
        .bind(email.map(str::trim))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn reservations_on_flight(&self, flight_id: &str) -> CoreResult<Vec<Reservation>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT reservation_id FROM flight_segments WHERE flight_id = $1")
                .bind(flight_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        self.load_many(ids).await
    }

    async fn reservations_departing_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Reservation>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT s.reservation_id
            FROM flight_segments s
            JOIN flights f ON f.id = s.flight_id
            WHERE f.departure_time BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        self.load_many(ids).await
    }

    async fn get_flight(&self, flight_id: &str) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, flight_number, origin, destination, departure_time, arrival_time, gate, status
            FROM flights WHERE id = $1
            "#,
        )
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Flight::try_from).transpose()
    }

    async fn save_flight(&self, flight: &Flight) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        upsert_flight(&mut tx, flight).await?;
        tx.commit().await.map_err(db_error)
    }
}

async fn upsert_flight(tx: &mut sqlx::Transaction<'_, Postgres>, flight: &Flight) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO flights (id, flight_number, origin, destination, departure_time, arrival_time, gate, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            flight_number = EXCLUDED.flight_number,
            departure_time = EXCLUDED.departure_time,
            arrival_time = EXCLUDED.arrival_time,
            gate = EXCLUDED.gate,
            status = EXCLUDED.status
        "#,
    )
    .bind(&flight.id)
    .bind(&flight.flight_number)
    .bind(&flight.origin)
    .bind(&flight.destination)
    .bind(flight.departure_time)
    .bind(flight.arrival_time)
    .bind(&flight.gate)
    .bind(flight.status.as_str())
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn save_session(&self, session: &Session) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, state, reservation_id, helper_link, call_id, context, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                reservation_id = EXCLUDED.reservation_id,
                helper_link = EXCLUDED.helper_link,
                call_id = EXCLUDED.call_id,
                context = EXCLUDED.context,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session.id)
        .bind(session.state.as_str())
        .bind(session.reservation_id)
        .bind(&session.helper_link)
        .bind(&session.call_id)
        .bind(&session.context)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> CoreResult<Option<Session>> {
        sqlx::query_as::<_, SessionRow>(&format!("{} WHERE id = $1", SESSION_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Session::try_from)
            .transpose()
    }

    async fn find_by_helper_link(&self, link: &str) -> CoreResult<Option<Session>> {
        sqlx::query_as::<_, SessionRow>(&format!("{} WHERE helper_link = $1", SESSION_SELECT))
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Session::try_from)
            .transpose()
    }

    async fn find_by_call_id(&self, call_id: &str) -> CoreResult<Option<Session>> {
        sqlx::query_as::<_, SessionRow>(&format!("{} WHERE call_id = $1", SESSION_SELECT))
            .bind(call_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Session::try_from)
            .transpose()
    }

    async fn sessions_for_reservation(&self, reservation_id: Uuid) -> CoreResult<Vec<Session>> {
        sqlx::query_as::<_, SessionRow>(&format!(
            "{} WHERE reservation_id = $1 ORDER BY created_at",
            SESSION_SELECT
        ))
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Session::try_from)
        .collect()
    }

    async fn append_message(&self, message: &Message) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, session_id, role, content, audio_url, intent, entities, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(message.session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.audio_url)
        .bind(&message.intent)
        .bind(&message.entities)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> CoreResult<Vec<Message>> {
        sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, session_id, role, content, audio_url, intent, entities, timestamp
            FROM messages WHERE session_id = $1
            ORDER BY timestamp
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Message::try_from)
        .collect()
    }
}

#[async_trait]
impl ActivityRepository for PgStore {
    async fn record_action(&self, action: &FamilyAction) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO family_actions (id, session_id, action_type, action_data, status,
                                        family_notes, result_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(action.id)
        .bind(action.session_id)
        .bind(&action.action_type)
        .bind(&action.action_data)
        .bind(action.status.as_str())
        .bind(&action.family_notes)
        .bind(&action.result_message)
        .bind(action.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_actions(&self, session_id: Uuid) -> CoreResult<Vec<FamilyAction>> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT id, session_id, action_type, action_data, status, family_notes, result_message, created_at
            FROM family_actions WHERE session_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(FamilyAction {
                    id: row.id,
                    session_id: row.session_id,
                    action_type: row.action_type,
                    action_data: row.action_data,
                    status: row.status.parse()?,
                    family_notes: row.family_notes,
                    result_message: row.result_message,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn record_location(&self, location: &PassengerLocation) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO passenger_locations (id, session_id, latitude, longitude, accuracy, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(location.id)
        .bind(location.session_id)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.accuracy)
        .bind(location.timestamp)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn latest_location(&self, session_id: Uuid) -> CoreResult<Option<PassengerLocation>> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, session_id, latitude, longitude, accuracy, timestamp
            FROM passenger_locations WHERE session_id = $1
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|row| PassengerLocation {
            id: row.id,
            session_id: row.session_id,
            latitude: row.latitude,
            longitude: row.longitude,
            accuracy: row.accuracy,
            timestamp: row.timestamp,
        }))
    }

    async fn save_alert(&self, alert: &LocationAlert) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO location_alerts (id, session_id, alert_type, message, distance_to_gate,
                                         estimated_walking_time, time_to_departure, acknowledged,
                                         voice_call_sent, email_sent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                acknowledged = EXCLUDED.acknowledged,
                voice_call_sent = EXCLUDED.voice_call_sent,
                email_sent = EXCLUDED.email_sent
            "#,
        )
        .bind(alert.id)
        .bind(alert.session_id)
        .bind(alert.alert_type.as_str())
        .bind(&alert.message)
        .bind(alert.distance_to_gate)
        .bind(alert.estimated_walking_time)
        .bind(alert.time_to_departure)
        .bind(alert.acknowledged)
        .bind(alert.voice_call_sent)
        .bind(alert.email_sent)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn latest_alert(
        &self,
        session_id: Uuid,
        alert_type: AlertType,
    ) -> CoreResult<Option<LocationAlert>> {
        sqlx::query_as::<_, AlertRow>(&format!(
            "{} WHERE session_id = $1 AND alert_type = $2 ORDER BY created_at DESC LIMIT 1",
            ALERT_SELECT
        ))
        .bind(session_id)
        .bind(alert_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(LocationAlert::try_from)
        .transpose()
    }

    async fn latest_unacknowledged_alert(&self, session_id: Uuid) -> CoreResult<Option<LocationAlert>> {
        sqlx::query_as::<_, AlertRow>(&format!(
            "{} WHERE session_id = $1 AND NOT acknowledged ORDER BY created_at DESC LIMIT 1",
            ALERT_SELECT
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(LocationAlert::try_from)
        .transpose()
    }

    async fn acknowledge_alert(&self, alert_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE location_alerts SET acknowledged = TRUE WHERE id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl HandoffRepository for PgStore {
    async fn save_dossier(&self, dossier: &HandoffDossier) -> CoreResult<()> {
        let transcript = serde_json::to_value(&dossier.transcript)
            .map_err(|e| CoreError::InternalError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO handoff_dossiers (id, session_id, status, priority, sentiment_score, reason,
                                          summary, metadata, transcript, assigned_agent,
                                          resolution_notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                priority = EXCLUDED.priority,
                sentiment_score = EXCLUDED.sentiment_score,
                summary = EXCLUDED.summary,
                metadata = EXCLUDED.metadata,
                transcript = EXCLUDED.transcript,
                assigned_agent = EXCLUDED.assigned_agent,
                resolution_notes = EXCLUDED.resolution_notes,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(dossier.id)
        .bind(dossier.session_id)
        .bind(dossier.status.as_str())
        .bind(dossier.priority.as_str())
        .bind(dossier.sentiment_score)
        .bind(&dossier.reason)
        .bind(&dossier.summary)
        .bind(&dossier.metadata)
        .bind(transcript)
        .bind(&dossier.assigned_agent)
        .bind(&dossier.resolution_notes)
        .bind(dossier.created_at)
        .bind(dossier.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_dossier(&self, id: Uuid) -> CoreResult<Option<HandoffDossier>> {
        sqlx::query_as::<_, DossierRow>(&format!("{} WHERE id = $1", DOSSIER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(HandoffDossier::try_from)
            .transpose()
    }

    async fn open_dossier_for_session(&self, session_id: Uuid) -> CoreResult<Option<HandoffDossier>> {
        sqlx::query_as::<_, DossierRow>(&format!(
            "{} WHERE session_id = $1 AND status <> 'resolved' ORDER BY created_at DESC LIMIT 1",
            DOSSIER_SELECT
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(HandoffDossier::try_from)
        .transpose()
    }

    async fn list_dossiers(&self, status: Option<HandoffStatus>) -> CoreResult<Vec<HandoffDossier>> {
        sqlx::query_as::<_, DossierRow>(&format!(
            "{} WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at",
            DOSSIER_SELECT
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(HandoffDossier::try_from)
        .collect()
    }
}

#[async_trait]
impl ConciergeStore for PgStore {
    async fn ping(&self) -> CoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(db_error)?;
        Ok(())
    }
}
