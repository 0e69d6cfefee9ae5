//! Stub vendors and fixtures shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use concierge_core::demo::demo_reservation;
use concierge_core::models::{FlightStatus, Language, Reservation, Session};
use concierge_core::providers::{
    CallPlacer, FlightDataProvider, Mailer, OutboundCall, OutboundEmail, ProviderError,
    ProviderResult, SpeechSynthesizer,
};
use concierge_core::search::{AirportInfo, FlightOption, FlightQuery};
use concierge_store::app_config::BusinessRules;

use crate::context::TripContext;

pub(crate) fn context() -> TripContext {
    TripContext::in_memory(BusinessRules::default())
}

/// Context with a stored demo reservation.
pub(crate) async fn seeded(code: &str) -> (TripContext, Reservation) {
    let ctx = context();
    let reservation = demo_reservation(code, Utc::now()).unwrap();
    ctx.store.save_reservation(&reservation).await.unwrap();
    (ctx, reservation)
}

/// Stored session attached to a reservation.
pub(crate) async fn session_for(ctx: &TripContext, reservation: &Reservation) -> Session {
    let mut session = Session::new(Duration::minutes(30));
    session.reservation_id = Some(reservation.id);
    session.helper_link = Some(format!("link-{}", &session.id.to_string()[..8]));
    ctx.store.save_session(&session).await.unwrap();
    session
}

pub(crate) struct StubFlights {
    count: usize,
    only_on: Option<NaiveDate>,
    calls: AtomicUsize,
}

impl StubFlights {
    pub fn with_flights(count: usize) -> Self {
        Self { count, only_on: None, calls: AtomicUsize::new(0) }
    }

    pub fn only_on(date: NaiveDate) -> Self {
        Self { count: 2, only_on: Some(date), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightDataProvider for StubFlights {
    async fn airport(&self, code: &str) -> ProviderResult<Option<AirportInfo>> {
        Ok(AirportInfo::fallback(code))
    }

    async fn airports(&self) -> ProviderResult<Vec<AirportInfo>> {
        Ok(Vec::new())
    }

    async fn flights(&self, query: &FlightQuery) -> ProviderResult<Vec<FlightOption>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.only_on.is_some_and(|d| d != query.date) {
            return Ok(Vec::new());
        }
        let origin = query.origin.clone().unwrap_or_else(|| "DFW".to_string());
        let destination = query.destination.clone().unwrap_or_else(|| "ORD".to_string());
        Ok((0..self.count)
            .map(|i| {
                let hour = 6 + 2 * i as u32;
                let departure = query.date.and_time(NaiveTime::from_hms_opt(hour, 15, 0).unwrap()).and_utc();
                FlightOption {
                    id: format!("stub-{}", i),
                    flight_number: format!("AA{}", 200 + i),
                    origin: origin.clone(),
                    destination: destination.clone(),
                    departure_time: departure,
                    arrival_time: departure + Duration::hours(2),
                    gate: "C4".to_string(),
                    status: FlightStatus::Scheduled,
                    duration: "2h 0m".to_string(),
                    aircraft: None,
                    distance_miles: None,
                    origin_city: origin.clone(),
                    destination_city: destination.clone(),
                }
            })
            .collect())
    }
}

pub(crate) struct StubCaller {
    name: &'static str,
    fail: bool,
    pub placed: Mutex<Vec<OutboundCall>>,
}

impl StubCaller {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name, fail: false, placed: Mutex::new(Vec::new()) })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name, fail: true, placed: Mutex::new(Vec::new()) })
    }

    pub fn count(&self) -> usize {
        self.placed.lock().unwrap().len()
    }
}

#[async_trait]
impl CallPlacer for StubCaller {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn place_call(&self, call: &OutboundCall) -> ProviderResult<String> {
        if self.fail {
            return Err(ProviderError::Status { provider: self.name, status: 503, body: "down".to_string() });
        }
        let mut placed = self.placed.lock().unwrap();
        placed.push(call.clone());
        Ok(format!("{}-call-{}", self.name, placed.len()))
    }
}

#[derive(Default)]
pub(crate) struct StubMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl StubMailer {
    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|e| e.subject.clone()).collect()
    }
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(&self, email: &OutboundEmail) -> ProviderResult<String> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("email-{}", sent.len()))
    }
}

#[derive(Default)]
pub(crate) struct StubSpeech {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn synthesize(&self, text: &str, _language: Language) -> ProviderResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.as_bytes().to_vec())
    }
}
