use concierge_core::models::{Language, ReservationView, SegmentView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripSummary {
    pub summary: String,
    pub summary_short: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeSummary {
    pub summary: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

/// Template summary used when the language model is unavailable.
pub fn fallback_trip_summary(reservation: &ReservationView, language: Language) -> TripSummary {
    let code = &reservation.confirmation_code;
    let (origin, destination, seat) = match reservation.flights.first() {
        Some(flight) => (
            flight.origin.as_str(),
            flight.destination.as_str(),
            flight.seat.as_deref().unwrap_or("Not assigned"),
        ),
        None => ("N/A", "N/A", "N/A"),
    };

    if language.is_spanish() {
        TripSummary {
            summary: format!(
                "¡Reservación confirmada! Vuelo de {} a {}. Asiento: {}. Código: {}.",
                origin, destination, seat, code
            ),
            summary_short: format!("Vuelo {} → {}, Código: {}", origin, destination, code),
        }
    } else {
        TripSummary {
            summary: format!(
                "Booking confirmed! Flight from {} to {}. Seat: {}. Confirmation: {}.",
                origin, destination, seat, code
            ),
            summary_short: format!("Flight {} → {}, Code: {}", origin, destination, code),
        }
    }
}

pub fn fallback_change_summary(
    original: &SegmentView,
    new: &SegmentView,
    language: Language,
) -> ChangeSummary {
    let es = language.is_spanish();
    let mut changes = Vec::new();

    if original.departure_time.time() != new.departure_time.time() {
        changes.push(if es { "hora de salida" } else { "departure time" }.to_string());
    }
    if original.departure_time.date_naive() != new.departure_time.date_naive() {
        changes.push(if es { "fecha" } else { "date" }.to_string());
    }
    if !original.flight_number.eq_ignore_ascii_case(&new.flight_number) {
        changes.push(if es { "número de vuelo" } else { "flight number" }.to_string());
    }

    let listed = if changes.is_empty() {
        if es { "ninguno".to_string() } else { "none".to_string() }
    } else {
        changes.join(", ")
    };

    let summary = if es {
        format!("Su vuelo ha sido cambiado. Cambios: {}.", listed)
    } else {
        format!("Your flight has been changed. Changes: {}.", listed)
    };

    ChangeSummary { summary, changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use concierge_core::demo::demo_reservation;

    #[test]
    fn test_trip_summary_templates() {
        let reservation = demo_reservation("DEMO123", Utc::now()).unwrap();
        let view = ReservationView::from(&reservation);

        let en = fallback_trip_summary(&view, Language::En);
        assert_eq!(
            en.summary,
            "Booking confirmed! Flight from DFW to ORD. Seat: 14A. Confirmation: DEMO123."
        );
        assert_eq!(en.summary_short, "Flight DFW → ORD, Code: DEMO123");

        let es = fallback_trip_summary(&view, Language::Es);
        assert!(es.summary.starts_with("¡Reservación confirmada!"));
        assert_eq!(es.summary_short, "Vuelo DFW → ORD, Código: DEMO123");
    }

    #[test]
    fn test_change_summary_lists_differences() {
        let reservation = demo_reservation("DEMO123", Utc::now()).unwrap();
        let original = ReservationView::from(&reservation).flights[0].clone();

        let mut moved = original.clone();
        moved.departure_time = original.departure_time + Duration::days(1);
        let summary = fallback_change_summary(&original, &moved, Language::En);
        assert_eq!(summary.changes, vec!["date".to_string()]);
        assert_eq!(summary.summary, "Your flight has been changed. Changes: date.");

        let same = fallback_change_summary(&original, &original, Language::Es);
        assert!(same.changes.is_empty());
        assert_eq!(same.summary, "Su vuelo ha sido cambiado. Cambios: ninguno.");
    }
}
