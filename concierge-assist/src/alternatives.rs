use chrono::{Duration, NaiveDate, NaiveTime};
use concierge_core::airports::city_name;
use concierge_core::models::FlightStatus;
use concierge_core::search::FlightOption;

/// Departure slots used when no live schedule is available.
const MOCK_DEPARTURES: [(u32, u32); 3] = [(8, 0), (14, 0), (19, 0)];
const MOCK_BLOCK_HOURS: i64 = 3;

/// Generates the three stand-in options for a route and day.
///
/// Flight numbers are derived from the route so that the same route always
/// offers the same numbers.
pub fn mock_alternatives(origin: &str, destination: &str, date: NaiveDate) -> Vec<FlightOption> {
    let origin = origin.trim().to_uppercase();
    let destination = destination.trim().to_uppercase();

    MOCK_DEPARTURES
        .iter()
        .enumerate()
        .filter_map(|(i, (hour, minute))| {
            let slot = i + 1;
            let departure = date
                .and_time(NaiveTime::from_hms_opt(*hour, *minute, 0)?)
                .and_utc();

            Some(FlightOption {
                id: format!("mock-{}-{}-{}", origin, destination, slot),
                flight_number: format!("AA{}", mock_flight_number(&origin, &destination, slot)),
                origin: origin.clone(),
                destination: destination.clone(),
                departure_time: departure,
                arrival_time: departure + Duration::hours(MOCK_BLOCK_HOURS),
                gate: "TBD".to_string(),
                status: FlightStatus::Scheduled,
                duration: format!("{}h 0m", MOCK_BLOCK_HOURS),
                aircraft: None,
                distance_miles: None,
                origin_city: city_name(&origin).to_string(),
                destination_city: city_name(&destination).to_string(),
            })
        })
        .collect()
}

/// Stable number in 1000..=9999 (FNV-1a over the route and slot).
fn mock_flight_number(origin: &str, destination: &str, slot: usize) -> u64 {
    let key = format!("{}{}{}", origin, destination, slot);
    let hash = key.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
        (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    });
    1000 + hash % 9000
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_three_daily_slots() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let options = mock_alternatives("dfw", "ord", date);

        assert_eq!(options.len(), 3);
        assert_eq!(options[0].id, "mock-DFW-ORD-1");
        assert_eq!(options[1].departure_time.hour(), 14);
        assert_eq!(options[2].arrival_time.hour(), 22);
        assert_eq!(options[0].gate, "TBD");
        assert_eq!(options[0].duration, "3h 0m");
        assert_eq!(options[0].destination_city, "Chicago");
    }

    #[test]
    fn test_flight_numbers_are_stable() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let first = mock_alternatives("DFW", "ORD", date);
        let again = mock_alternatives("DFW", "ORD", date + Duration::days(3));

        for (a, b) in first.iter().zip(&again) {
            assert_eq!(a.flight_number, b.flight_number);
            let n: u32 = a.flight_number.trim_start_matches("AA").parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }
}
