//! Pre-seeded demo reservations. Departure times are relative to "now" so the
//! demo always has upcoming trips.

use chrono::{DateTime, Duration, Utc};
use concierge_shared::Masked;
use uuid::Uuid;

use crate::models::{
    Flight, FlightSegment, FlightStatus, Language, Passenger, Reservation, ReservationStatus,
};

struct DemoLeg {
    flight_number: &'static str,
    origin: &'static str,
    destination: &'static str,
    /// Minutes after "now".
    departs_in: i64,
    arrives_in: i64,
    gate: &'static str,
    seat: &'static str,
}

struct DemoBooking {
    code: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    email: &'static str,
    phone: &'static str,
    language: Language,
    legs: &'static [DemoLeg],
}

const fn mins(days: i64, hours: i64, minutes: i64) -> i64 {
    days * 24 * 60 + hours * 60 + minutes
}

const DEMO_BOOKINGS: &[DemoBooking] = &[
    DemoBooking {
        code: "DEMO123",
        first_name: "Margaret",
        last_name: "Johnson",
        email: "margaret.johnson@example.com",
        phone: "214-555-0123",
        language: Language::En,
        legs: &[DemoLeg {
            flight_number: "AA1234",
            origin: "DFW",
            destination: "ORD",
            departs_in: mins(1, 14, 0),
            arrives_in: mins(1, 17, 0),
            gate: "A12",
            seat: "14A",
        }],
    },
    DemoBooking {
        code: "TEST456",
        first_name: "Robert",
        last_name: "Smith",
        email: "robert.smith@example.com",
        phone: "310-555-0456",
        language: Language::En,
        legs: &[
            DemoLeg {
                flight_number: "AA567",
                origin: "LAX",
                destination: "JFK",
                departs_in: mins(2, 9, 0),
                arrives_in: mins(2, 17, 30),
                gate: "B7",
                seat: "22C",
            },
            DemoLeg {
                flight_number: "AA890",
                origin: "JFK",
                destination: "MIA",
                departs_in: mins(2, 19, 0),
                arrives_in: mins(2, 22, 15),
                gate: "C3",
                seat: "8F",
            },
        ],
    },
    DemoBooking {
        code: "ABUELA1",
        first_name: "Maria",
        last_name: "Garcia",
        email: "maria.garcia@example.com",
        phone: "305-555-0789",
        language: Language::Es,
        legs: &[DemoLeg {
            flight_number: "AA2345",
            origin: "MIA",
            destination: "DFW",
            departs_in: mins(3, 11, 0),
            arrives_in: mins(3, 13, 45),
            gate: "D15",
            seat: "6A",
        }],
    },
    DemoBooking {
        code: "SENIOR2",
        first_name: "William",
        last_name: "Thompson",
        email: "william.thompson@example.com",
        phone: "773-555-0234",
        language: Language::En,
        legs: &[DemoLeg {
            flight_number: "AA789",
            origin: "ORD",
            destination: "DFW",
            departs_in: mins(1, 8, 0),
            arrives_in: mins(1, 10, 30),
            gate: "K8",
            seat: "3C",
        }],
    },
    DemoBooking {
        code: "FAMILY3",
        first_name: "Dorothy",
        last_name: "Williams",
        email: "dorothy.williams@example.com",
        phone: "602-555-0567",
        language: Language::En,
        legs: &[
            DemoLeg {
                flight_number: "AA456",
                origin: "PHX",
                destination: "LAX",
                departs_in: mins(4, 15, 0),
                arrives_in: mins(4, 16, 15),
                gate: "E22",
                seat: "12B",
            },
            DemoLeg {
                flight_number: "AA1122",
                origin: "LAX",
                destination: "HNL",
                departs_in: mins(4, 18, 0),
                arrives_in: mins(4, 21, 30),
                gate: "T4",
                seat: "12B",
            },
        ],
    },
];

pub fn demo_codes() -> impl Iterator<Item = &'static str> {
    DEMO_BOOKINGS.iter().map(|b| b.code)
}

/// All demo reservations, anchored at `now`.
pub fn demo_reservations(now: DateTime<Utc>) -> Vec<Reservation> {
    DEMO_BOOKINGS.iter().map(|b| build(b, now)).collect()
}

/// Demo reservation for a confirmation code (case-insensitive).
pub fn demo_reservation(code: &str, now: DateTime<Utc>) -> Option<Reservation> {
    DEMO_BOOKINGS
        .iter()
        .find(|b| b.code.eq_ignore_ascii_case(code.trim()))
        .map(|b| build(b, now))
}

/// Demo reservation whose passenger matches the last name or email.
pub fn demo_reservation_for(
    last_name: Option<&str>,
    email: Option<&str>,
    now: DateTime<Utc>,
) -> Option<Reservation> {
    DEMO_BOOKINGS
        .iter()
        .find(|b| {
            last_name.is_some_and(|n| b.last_name.eq_ignore_ascii_case(n.trim()))
                || email.is_some_and(|e| b.email.eq_ignore_ascii_case(e.trim()))
        })
        .map(|b| build(b, now))
}

fn build(booking: &DemoBooking, now: DateTime<Utc>) -> Reservation {
    let segments = booking
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| FlightSegment {
            id: Uuid::new_v4(),
            flight: Flight {
                id: format!("demo-{}-{}", booking.code, i + 1),
                flight_number: leg.flight_number.to_string(),
                origin: leg.origin.to_string(),
                destination: leg.destination.to_string(),
                departure_time: now + Duration::minutes(leg.departs_in),
                arrival_time: now + Duration::minutes(leg.arrives_in),
                gate: Some(leg.gate.to_string()),
                status: FlightStatus::Scheduled,
            },
            seat: Some(leg.seat.to_string()),
            segment_order: i as i32 + 1,
        })
        .collect();

    Reservation {
        id: Uuid::new_v4(),
        confirmation_code: booking.code.to_string(),
        passenger: Passenger {
            id: Uuid::new_v4(),
            first_name: booking.first_name.to_string(),
            last_name: booking.last_name.to_string(),
            email: Masked::from(booking.email),
            phone: Some(Masked::from(booking.phone)),
            aadvantage_number: None,
            language: booking.language,
            seat_preference: None,
        },
        segments,
        status: ReservationStatus::Confirmed,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_lookup_is_case_insensitive() {
        let now = Utc::now();
        let res = demo_reservation("demo123", now).unwrap();
        assert_eq!(res.confirmation_code, "DEMO123");
        assert_eq!(res.passenger.first_name, "Margaret");

        let flight = res.first_flight().unwrap();
        assert_eq!(flight.origin, "DFW");
        assert_eq!(flight.departure_time, now + Duration::hours(38));
        assert!(demo_reservation("NOPE99", now).is_none());
    }

    #[test]
    fn test_multi_segment_ordering() {
        let res = demo_reservation("TEST456", Utc::now()).unwrap();
        assert_eq!(res.segments.len(), 2);
        assert_eq!(res.segments[0].segment_order, 1);
        assert_eq!(res.segments[1].flight.origin, "JFK");
    }

    #[test]
    fn test_passenger_search() {
        let now = Utc::now();
        let by_name = demo_reservation_for(Some("garcia"), None, now).unwrap();
        assert_eq!(by_name.confirmation_code, "ABUELA1");
        assert_eq!(by_name.passenger.language, Language::Es);

        let by_email = demo_reservation_for(None, Some("Robert.Smith@example.com"), now).unwrap();
        assert_eq!(by_email.confirmation_code, "TEST456");
        assert_eq!(demo_reservations(now).len(), demo_codes().count());
    }
}
