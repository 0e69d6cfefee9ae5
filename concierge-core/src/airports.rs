//! Static airport reference data: spoken city names, gate and terminal
//! coordinates, and geofences used by location tracking.

use crate::geo::{Cardinal, Coordinate};
use crate::models::Language;
use serde::Serialize;

/// Spoken city or airport name to IATA code.
const AIRPORT_CODES: &[(&str, &str)] = &[
    ("dallas", "DFW"),
    ("dfw", "DFW"),
    ("dallas fort worth", "DFW"),
    ("chicago", "ORD"),
    ("ord", "ORD"),
    ("o'hare", "ORD"),
    ("los angeles", "LAX"),
    ("lax", "LAX"),
    ("la", "LAX"),
    ("new york", "JFK"),
    ("jfk", "JFK"),
    ("nyc", "JFK"),
    ("miami", "MIA"),
    ("phoenix", "PHX"),
    ("honolulu", "HNL"),
    ("hawaii", "HNL"),
    ("boston", "BOS"),
    ("san francisco", "SFO"),
    ("seattle", "SEA"),
    ("denver", "DEN"),
    ("atlanta", "ATL"),
    ("charlotte", "CLT"),
    ("philadelphia", "PHL"),
    ("washington", "DCA"),
    ("dca", "DCA"),
    ("reagan", "DCA"),
];

const CITY_NAMES: &[(&str, &str)] = &[
    ("DFW", "Dallas"),
    ("ORD", "Chicago"),
    ("LAX", "Los Angeles"),
    ("JFK", "New York"),
    ("MIA", "Miami"),
    ("PHX", "Phoenix"),
    ("HNL", "Honolulu"),
    ("BOS", "Boston"),
    ("SFO", "San Francisco"),
    ("SEA", "Seattle"),
    ("DEN", "Denver"),
    ("ATL", "Atlanta"),
    ("CLT", "Charlotte"),
    ("PHL", "Philadelphia"),
    ("DCA", "Washington D.C."),
];

struct GateEntry {
    gate: &'static str,
    latitude: f64,
    longitude: f64,
    terminal: &'static str,
}

const GATES: &[(&str, &[GateEntry])] = &[
    ("DFW", &[
        GateEntry { gate: "A1", latitude: 32.9002, longitude: -97.0370, terminal: "A" },
        GateEntry { gate: "A2", latitude: 32.9004, longitude: -97.0368, terminal: "A" },
        GateEntry { gate: "A3", latitude: 32.9006, longitude: -97.0366, terminal: "A" },
        GateEntry { gate: "A10", latitude: 32.9010, longitude: -97.0360, terminal: "A" },
        GateEntry { gate: "A15", latitude: 32.9012, longitude: -97.0355, terminal: "A" },
        GateEntry { gate: "A20", latitude: 32.9015, longitude: -97.0350, terminal: "A" },
        GateEntry { gate: "A25", latitude: 32.9018, longitude: -97.0345, terminal: "A" },
        GateEntry { gate: "A30", latitude: 32.9020, longitude: -97.0340, terminal: "A" },
        GateEntry { gate: "A35", latitude: 32.9022, longitude: -97.0335, terminal: "A" },
        GateEntry { gate: "A38", latitude: 32.9024, longitude: -97.0332, terminal: "A" },
        GateEntry { gate: "B1", latitude: 32.8975, longitude: -97.0382, terminal: "B" },
        GateEntry { gate: "B5", latitude: 32.8978, longitude: -97.0380, terminal: "B" },
        GateEntry { gate: "B10", latitude: 32.8980, longitude: -97.0375, terminal: "B" },
        GateEntry { gate: "B15", latitude: 32.8982, longitude: -97.0370, terminal: "B" },
        GateEntry { gate: "B20", latitude: 32.8985, longitude: -97.0365, terminal: "B" },
        GateEntry { gate: "B22", latitude: 32.8986, longitude: -97.0363, terminal: "B" },
        GateEntry { gate: "B25", latitude: 32.8988, longitude: -97.0360, terminal: "B" },
        GateEntry { gate: "B30", latitude: 32.8990, longitude: -97.0355, terminal: "B" },
        GateEntry { gate: "B35", latitude: 32.8992, longitude: -97.0350, terminal: "B" },
        GateEntry { gate: "B40", latitude: 32.8995, longitude: -97.0345, terminal: "B" },
        GateEntry { gate: "B45", latitude: 32.8998, longitude: -97.0340, terminal: "B" },
        GateEntry { gate: "C1", latitude: 32.8950, longitude: -97.0400, terminal: "C" },
        GateEntry { gate: "C5", latitude: 32.8952, longitude: -97.0395, terminal: "C" },
        GateEntry { gate: "C10", latitude: 32.8955, longitude: -97.0390, terminal: "C" },
        GateEntry { gate: "C15", latitude: 32.8958, longitude: -97.0385, terminal: "C" },
        GateEntry { gate: "C20", latitude: 32.8960, longitude: -97.0380, terminal: "C" },
        GateEntry { gate: "C25", latitude: 32.8962, longitude: -97.0375, terminal: "C" },
        GateEntry { gate: "C30", latitude: 32.8965, longitude: -97.0370, terminal: "C" },
        GateEntry { gate: "D1", latitude: 32.8925, longitude: -97.0420, terminal: "D" },
        GateEntry { gate: "D5", latitude: 32.8928, longitude: -97.0415, terminal: "D" },
        GateEntry { gate: "D10", latitude: 32.8930, longitude: -97.0410, terminal: "D" },
        GateEntry { gate: "D15", latitude: 32.8932, longitude: -97.0405, terminal: "D" },
        GateEntry { gate: "D20", latitude: 32.8935, longitude: -97.0400, terminal: "D" },
        GateEntry { gate: "D25", latitude: 32.8938, longitude: -97.0395, terminal: "D" },
        GateEntry { gate: "D30", latitude: 32.8940, longitude: -97.0390, terminal: "D" },
        GateEntry { gate: "E1", latitude: 32.8900, longitude: -97.0440, terminal: "E" },
        GateEntry { gate: "E5", latitude: 32.8902, longitude: -97.0435, terminal: "E" },
        GateEntry { gate: "E10", latitude: 32.8905, longitude: -97.0430, terminal: "E" },
        GateEntry { gate: "E15", latitude: 32.8908, longitude: -97.0425, terminal: "E" },
        GateEntry { gate: "E20", latitude: 32.8910, longitude: -97.0420, terminal: "E" },
        GateEntry { gate: "E25", latitude: 32.8912, longitude: -97.0415, terminal: "E" },
        GateEntry { gate: "E30", latitude: 32.8915, longitude: -97.0410, terminal: "E" },
    ]),
    ("ORD", &[
        GateEntry { gate: "B1", latitude: 41.9792, longitude: -87.9040, terminal: "1" },
        GateEntry { gate: "B5", latitude: 41.9795, longitude: -87.9035, terminal: "1" },
        GateEntry { gate: "B10", latitude: 41.9798, longitude: -87.9030, terminal: "1" },
        GateEntry { gate: "B15", latitude: 41.9800, longitude: -87.9025, terminal: "1" },
        GateEntry { gate: "B20", latitude: 41.9802, longitude: -87.9020, terminal: "1" },
        GateEntry { gate: "C1", latitude: 41.9805, longitude: -87.9015, terminal: "1" },
        GateEntry { gate: "C5", latitude: 41.9808, longitude: -87.9010, terminal: "1" },
        GateEntry { gate: "C10", latitude: 41.9810, longitude: -87.9005, terminal: "1" },
        GateEntry { gate: "E1", latitude: 41.9770, longitude: -87.9060, terminal: "2" },
        GateEntry { gate: "E5", latitude: 41.9772, longitude: -87.9055, terminal: "2" },
        GateEntry { gate: "E10", latitude: 41.9775, longitude: -87.9050, terminal: "2" },
        GateEntry { gate: "F1", latitude: 41.9778, longitude: -87.9045, terminal: "2" },
        GateEntry { gate: "F5", latitude: 41.9780, longitude: -87.9040, terminal: "2" },
        GateEntry { gate: "F10", latitude: 41.9782, longitude: -87.9035, terminal: "2" },
        GateEntry { gate: "G1", latitude: 41.9750, longitude: -87.9080, terminal: "3" },
        GateEntry { gate: "G5", latitude: 41.9752, longitude: -87.9075, terminal: "3" },
        GateEntry { gate: "G10", latitude: 41.9755, longitude: -87.9070, terminal: "3" },
        GateEntry { gate: "H1", latitude: 41.9758, longitude: -87.9065, terminal: "3" },
        GateEntry { gate: "H5", latitude: 41.9760, longitude: -87.9060, terminal: "3" },
        GateEntry { gate: "H10", latitude: 41.9762, longitude: -87.9055, terminal: "3" },
        GateEntry { gate: "K1", latitude: 41.9765, longitude: -87.9050, terminal: "3" },
        GateEntry { gate: "K5", latitude: 41.9768, longitude: -87.9045, terminal: "3" },
    ]),
    ("LAX", &[
        GateEntry { gate: "40", latitude: 33.9428, longitude: -118.4060, terminal: "4" },
        GateEntry { gate: "41", latitude: 33.9430, longitude: -118.4058, terminal: "4" },
        GateEntry { gate: "42", latitude: 33.9432, longitude: -118.4056, terminal: "4" },
        GateEntry { gate: "43", latitude: 33.9434, longitude: -118.4054, terminal: "4" },
        GateEntry { gate: "44", latitude: 33.9436, longitude: -118.4052, terminal: "4" },
        GateEntry { gate: "45", latitude: 33.9438, longitude: -118.4050, terminal: "4" },
        GateEntry { gate: "46", latitude: 33.9440, longitude: -118.4048, terminal: "4" },
        GateEntry { gate: "47", latitude: 33.9442, longitude: -118.4046, terminal: "4" },
        GateEntry { gate: "48", latitude: 33.9444, longitude: -118.4044, terminal: "4" },
        GateEntry { gate: "50", latitude: 33.9410, longitude: -118.4080, terminal: "5" },
        GateEntry { gate: "51", latitude: 33.9412, longitude: -118.4078, terminal: "5" },
        GateEntry { gate: "52", latitude: 33.9414, longitude: -118.4076, terminal: "5" },
        GateEntry { gate: "53", latitude: 33.9416, longitude: -118.4074, terminal: "5" },
        GateEntry { gate: "54", latitude: 33.9418, longitude: -118.4072, terminal: "5" },
        GateEntry { gate: "55", latitude: 33.9420, longitude: -118.4070, terminal: "5" },
    ]),
    ("JFK", &[
        GateEntry { gate: "1", latitude: 40.6440, longitude: -73.7860, terminal: "8" },
        GateEntry { gate: "2", latitude: 40.6442, longitude: -73.7858, terminal: "8" },
        GateEntry { gate: "3", latitude: 40.6444, longitude: -73.7856, terminal: "8" },
        GateEntry { gate: "4", latitude: 40.6446, longitude: -73.7854, terminal: "8" },
        GateEntry { gate: "5", latitude: 40.6448, longitude: -73.7852, terminal: "8" },
        GateEntry { gate: "6", latitude: 40.6450, longitude: -73.7850, terminal: "8" },
        GateEntry { gate: "7", latitude: 40.6452, longitude: -73.7848, terminal: "8" },
        GateEntry { gate: "8", latitude: 40.6454, longitude: -73.7846, terminal: "8" },
        GateEntry { gate: "9", latitude: 40.6456, longitude: -73.7844, terminal: "8" },
        GateEntry { gate: "10", latitude: 40.6458, longitude: -73.7842, terminal: "8" },
    ]),
    ("MIA", &[
        GateEntry { gate: "D1", latitude: 25.7960, longitude: -80.2760, terminal: "D" },
        GateEntry { gate: "D5", latitude: 25.7962, longitude: -80.2755, terminal: "D" },
        GateEntry { gate: "D10", latitude: 25.7965, longitude: -80.2750, terminal: "D" },
        GateEntry { gate: "D15", latitude: 25.7968, longitude: -80.2745, terminal: "D" },
        GateEntry { gate: "D20", latitude: 25.7970, longitude: -80.2740, terminal: "D" },
        GateEntry { gate: "D25", latitude: 25.7972, longitude: -80.2735, terminal: "D" },
        GateEntry { gate: "D30", latitude: 25.7975, longitude: -80.2730, terminal: "D" },
        GateEntry { gate: "D35", latitude: 25.7978, longitude: -80.2725, terminal: "D" },
        GateEntry { gate: "D40", latitude: 25.7980, longitude: -80.2720, terminal: "D" },
    ]),
    ("PHX", &[
        GateEntry { gate: "A1", latitude: 33.4360, longitude: -112.0080, terminal: "4" },
        GateEntry { gate: "A5", latitude: 33.4362, longitude: -112.0075, terminal: "4" },
        GateEntry { gate: "A10", latitude: 33.4365, longitude: -112.0070, terminal: "4" },
        GateEntry { gate: "A15", latitude: 33.4368, longitude: -112.0065, terminal: "4" },
        GateEntry { gate: "A20", latitude: 33.4370, longitude: -112.0060, terminal: "4" },
        GateEntry { gate: "B1", latitude: 33.4340, longitude: -112.0100, terminal: "4" },
        GateEntry { gate: "B5", latitude: 33.4342, longitude: -112.0095, terminal: "4" },
        GateEntry { gate: "B10", latitude: 33.4345, longitude: -112.0090, terminal: "4" },
        GateEntry { gate: "B15", latitude: 33.4348, longitude: -112.0085, terminal: "4" },
        GateEntry { gate: "B20", latitude: 33.4350, longitude: -112.0080, terminal: "4" },
    ]),
    ("PIT", &[
        GateEntry { gate: "A1", latitude: 40.4955, longitude: -80.2425, terminal: "Airside" },
        GateEntry { gate: "A5", latitude: 40.4957, longitude: -80.2420, terminal: "Airside" },
        GateEntry { gate: "A10", latitude: 40.4960, longitude: -80.2415, terminal: "Airside" },
        GateEntry { gate: "A15", latitude: 40.4962, longitude: -80.2410, terminal: "Airside" },
        GateEntry { gate: "A20", latitude: 40.4965, longitude: -80.2405, terminal: "Airside" },
        GateEntry { gate: "B1", latitude: 40.4950, longitude: -80.2420, terminal: "Airside" },
        GateEntry { gate: "B5", latitude: 40.4952, longitude: -80.2415, terminal: "Airside" },
        GateEntry { gate: "B10", latitude: 40.4955, longitude: -80.2410, terminal: "Airside" },
        GateEntry { gate: "B15", latitude: 40.4957, longitude: -80.2405, terminal: "Airside" },
        GateEntry { gate: "B20", latitude: 40.4960, longitude: -80.2400, terminal: "Airside" },
        GateEntry { gate: "B22", latitude: 40.4958, longitude: -80.2413, terminal: "Airside" },
        GateEntry { gate: "B25", latitude: 40.4962, longitude: -80.2395, terminal: "Airside" },
        GateEntry { gate: "C1", latitude: 40.4945, longitude: -80.2430, terminal: "Airside" },
        GateEntry { gate: "C5", latitude: 40.4947, longitude: -80.2425, terminal: "Airside" },
        GateEntry { gate: "C10", latitude: 40.4950, longitude: -80.2420, terminal: "Airside" },
    ]),
];

struct TerminalEntry {
    terminal: &'static str,
    latitude: f64,
    longitude: f64,
    name: &'static str,
}

const TERMINALS: &[(&str, &[TerminalEntry])] = &[
    ("DFW", &[
        TerminalEntry { terminal: "A", latitude: 32.9010, longitude: -97.0355, name: "Terminal A" },
        TerminalEntry { terminal: "B", latitude: 32.8985, longitude: -97.0365, name: "Terminal B" },
        TerminalEntry { terminal: "C", latitude: 32.8958, longitude: -97.0385, name: "Terminal C" },
        TerminalEntry { terminal: "D", latitude: 32.8935, longitude: -97.0400, name: "Terminal D" },
        TerminalEntry { terminal: "E", latitude: 32.8908, longitude: -97.0425, name: "Terminal E" },
    ]),
    ("ORD", &[
        TerminalEntry { terminal: "1", latitude: 41.9800, longitude: -87.9025, name: "Terminal 1" },
        TerminalEntry { terminal: "2", latitude: 41.9775, longitude: -87.9050, name: "Terminal 2" },
        TerminalEntry { terminal: "3", latitude: 41.9755, longitude: -87.9070, name: "Terminal 3" },
        TerminalEntry { terminal: "5", latitude: 41.9730, longitude: -87.9090, name: "Terminal 5 (International)" },
    ]),
    ("PIT", &[
        TerminalEntry { terminal: "Airside", latitude: 40.4955, longitude: -80.2415, name: "Airside Terminal" },
        TerminalEntry { terminal: "Landside", latitude: 40.4920, longitude: -80.2370, name: "Landside Terminal" },
    ]),
];

#[derive(Debug, Clone, Serialize)]
pub struct Geofence {
    pub code: &'static str,
    pub center: Coordinate,
    pub radius_km: f64,
    pub name: &'static str,
}

const GEOFENCES: &[Geofence] = &[
    Geofence { code: "DFW", center: Coordinate::new(32.8968, -97.0380), radius_km: 5.0, name: "Dallas/Fort Worth International Airport" },
    Geofence { code: "ORD", center: Coordinate::new(41.9742, -87.9073), radius_km: 4.0, name: "O'Hare International Airport" },
    Geofence { code: "LAX", center: Coordinate::new(33.9425, -118.4081), radius_km: 3.0, name: "Los Angeles International Airport" },
    Geofence { code: "JFK", center: Coordinate::new(40.6413, -73.7781), radius_km: 3.0, name: "John F. Kennedy International Airport" },
    Geofence { code: "MIA", center: Coordinate::new(25.7959, -80.2870), radius_km: 3.0, name: "Miami International Airport" },
    Geofence { code: "PHX", center: Coordinate::new(33.4373, -112.0078), radius_km: 3.0, name: "Phoenix Sky Harbor International Airport" },
    Geofence { code: "CLT", center: Coordinate::new(35.2140, -80.9431), radius_km: 3.0, name: "Charlotte Douglas International Airport" },
    Geofence { code: "DCA", center: Coordinate::new(38.8512, -77.0402), radius_km: 2.0, name: "Ronald Reagan Washington National Airport" },
    Geofence { code: "LGA", center: Coordinate::new(40.7769, -73.8740), radius_km: 2.0, name: "LaGuardia Airport" },
    Geofence { code: "PIT", center: Coordinate::new(40.4958, -80.2413), radius_km: 3.0, name: "Pittsburgh International Airport" },
];

/// Passengers further than this from every airport are "not at an airport".
pub const NEAREST_AIRPORT_MAX_KM: f64 = 10.0;

/// City for an airport code, or the code itself when unknown.
pub fn city_name(code: &str) -> &str {
    CITY_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, city)| *city)
        .unwrap_or(code)
}

/// Resolve a spoken city ("dallas", "O'Hare") or a known code to an IATA code.
pub fn code_for_city(spoken: &str) -> Option<&'static str> {
    let needle = spoken.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some((_, code)) = AIRPORT_CODES.iter().find(|(name, _)| *name == needle) {
        return Some(code);
    }
    CITY_NAMES
        .iter()
        .map(|(code, _)| *code)
        .chain(GEOFENCES.iter().map(|g| g.code))
        .find(|code| code.eq_ignore_ascii_case(&needle))
}

/// Airports with a city entry, as `(code, city)`.
pub fn known_cities() -> impl Iterator<Item = (&'static str, &'static str)> {
    CITY_NAMES.iter().copied()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GateLocation {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub terminal: String,
    /// Set when only the terminal centre could be resolved.
    pub approximate: bool,
}

/// Coordinates of a gate: exact match, then with leading zeros stripped, then
/// the centre of the terminal named by the gate's first character.
pub fn gate_location(airport: &str, gate: &str) -> Option<GateLocation> {
    let gate = gate.trim().to_uppercase();
    if gate.is_empty() {
        return None;
    }

    if let Some((_, gates)) = GATES.iter().find(|(code, _)| code.eq_ignore_ascii_case(airport)) {
        let stripped = gate.trim_start_matches('0');
        let hit = gates
            .iter()
            .find(|g| g.gate == gate)
            .or_else(|| gates.iter().find(|g| g.gate == stripped));
        if let Some(entry) = hit {
            return Some(GateLocation {
                coordinate: Coordinate::new(entry.latitude, entry.longitude),
                terminal: entry.terminal.to_string(),
                approximate: false,
            });
        }
    }

    let first = gate.chars().next()?.to_string();
    terminal_entry(airport, &first).map(|t| GateLocation {
        coordinate: Coordinate::new(t.latitude, t.longitude),
        terminal: first,
        approximate: true,
    })
}

fn terminal_entry(airport: &str, terminal: &str) -> Option<&'static TerminalEntry> {
    TERMINALS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(airport))
        .and_then(|(_, terminals)| {
            terminals.iter().find(|t| t.terminal.eq_ignore_ascii_case(terminal))
        })
}

/// Centre and display name of a terminal.
pub fn terminal_location(airport: &str, terminal: &str) -> Option<(Coordinate, &'static str)> {
    terminal_entry(airport, terminal).map(|t| (Coordinate::new(t.latitude, t.longitude), t.name))
}

pub fn geofence(code: &str) -> Option<&'static Geofence> {
    GEOFENCES.iter().find(|g| g.code.eq_ignore_ascii_case(code))
}

/// Closest airport within [`NEAREST_AIRPORT_MAX_KM`], with its distance in km.
pub fn nearest_airport(position: &Coordinate) -> Option<(&'static Geofence, f64)> {
    GEOFENCES
        .iter()
        .map(|g| (g, position.distance_to(&g.center) / 1000.0))
        .filter(|(_, km)| *km <= NEAREST_AIRPORT_MAX_KM)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

pub fn is_in_airport(position: &Coordinate, code: &str) -> bool {
    geofence(code)
        .map(|g| position.distance_to(&g.center) / 1000.0 <= g.radius_km)
        .unwrap_or(false)
}

/// One-sentence walking hint toward a gate.
pub fn directions(from: &Coordinate, airport: &str, gate: &str, language: Language) -> String {
    let Some(target) = gate_location(airport, gate) else {
        return match language {
            Language::Es => format!("Dirijase a la puerta {}. Consulte las pantallas del aeropuerto.", gate),
            Language::En => format!("Head towards gate {}. Check airport displays for directions.", gate),
        };
    };

    let heading = Cardinal::between(from, &target.coordinate);
    let terminal = target.terminal;

    match (language, terminal.is_empty()) {
        (Language::Es, false) => format!(
            "Dirijase hacia el {} hacia la Terminal {}. Su puerta {} esta en esa direccion.",
            heading.spanish(), terminal, gate
        ),
        (Language::Es, true) => format!("Dirijase hacia el {} hacia la puerta {}.", heading.spanish(), gate),
        (Language::En, false) => format!(
            "Head {} towards Terminal {}. Gate {} is in that direction.",
            heading.english(), terminal, gate
        ),
        (Language::En, true) => format!("Head {} towards gate {}.", heading.english(), gate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_lookups() {
        assert_eq!(city_name("DFW"), "Dallas");
        assert_eq!(city_name("dca"), "Washington D.C.");
        assert_eq!(city_name("XYZ"), "XYZ");
        assert_eq!(code_for_city("Dallas Fort Worth"), Some("DFW"));
        assert_eq!(code_for_city("o'hare"), Some("ORD"));
        assert_eq!(code_for_city("HNL"), Some("HNL"));
        assert_eq!(code_for_city("lga"), Some("LGA"));
        assert_eq!(code_for_city("gotham"), None);
    }

    #[test]
    fn test_gate_location_exact_and_stripped() {
        let exact = gate_location("dfw", "b22").unwrap();
        assert_eq!(exact.coordinate, Coordinate::new(32.8986, -97.0363));
        assert_eq!(exact.terminal, "B");
        assert!(!exact.approximate);

        let stripped = gate_location("JFK", "07").unwrap();
        assert_eq!(stripped.coordinate, Coordinate::new(40.6452, -73.7848));
    }

    #[test]
    fn test_gate_location_falls_back_to_terminal() {
        // A12 is not surveyed, terminal A is
        let approx = gate_location("DFW", "A12").unwrap();
        assert!(approx.approximate);
        assert_eq!(approx.coordinate, Coordinate::new(32.9010, -97.0355));

        assert!(gate_location("LAX", "T4").is_none());
        assert!(gate_location("DFW", "").is_none());
    }

    #[test]
    fn test_nearest_airport_and_geofence() {
        let near_dfw = Coordinate::new(32.90, -97.04);
        let (fence, km) = nearest_airport(&near_dfw).unwrap();
        assert_eq!(fence.code, "DFW");
        assert!(km < 1.0);
        assert!(is_in_airport(&near_dfw, "DFW"));
        assert!(!is_in_airport(&near_dfw, "ORD"));

        let downtown_dallas = Coordinate::new(32.7767, -96.7970);
        assert!(nearest_airport(&downtown_dallas).is_none());
    }

    #[test]
    fn test_directions_bilingual() {
        let curb = Coordinate::new(32.8950, -97.0370);
        let en = directions(&curb, "DFW", "A15", Language::En);
        assert_eq!(en, "Head north towards Terminal A. Gate A15 is in that direction.");
        let es = directions(&curb, "DFW", "A15", Language::Es);
        assert!(es.starts_with("Dirijase hacia el norte"));

        let unknown = directions(&curb, "HNL", "T4", Language::En);
        assert_eq!(unknown, "Head towards gate T4. Check airport displays for directions.");
    }
}
