use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_m(self, other)
    }

    /// Straight-line interpolation; fine at terminal scale.
    pub fn lerp(&self, other: &Coordinate, t: f64) -> Coordinate {
        Coordinate {
            latitude: self.latitude + (other.latitude - self.latitude) * t,
            longitude: self.longitude + (other.longitude - self.longitude) * t,
        }
    }
}

pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalkingPace {
    Normal,
    #[default]
    Elderly,
    Rushed,
}

impl WalkingPace {
    pub fn meters_per_minute(&self) -> f64 {
        match self {
            WalkingPace::Normal => 80.0,
            WalkingPace::Elderly => 50.0,
            WalkingPace::Rushed => 100.0,
        }
    }
}

/// Whole minutes to walk a distance, never less than one.
pub fn walking_minutes(distance_m: f64, pace: WalkingPace) -> i64 {
    let minutes = (distance_m / pace.meters_per_minute()).round() as i64;
    minutes.max(1)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cardinal {
    North,
    South,
    East,
    West,
}

impl Cardinal {
    /// Dominant axis wins; ties go east/west.
    pub fn between(from: &Coordinate, to: &Coordinate) -> Self {
        let dlat = to.latitude - from.latitude;
        let dlng = to.longitude - from.longitude;
        if dlat.abs() > dlng.abs() {
            if dlat > 0.0 { Cardinal::North } else { Cardinal::South }
        } else if dlng > 0.0 {
            Cardinal::East
        } else {
            Cardinal::West
        }
    }

    pub fn english(&self) -> &'static str {
        match self {
            Cardinal::North => "north",
            Cardinal::South => "south",
            Cardinal::East => "east",
            Cardinal::West => "west",
        }
    }

    pub fn spanish(&self) -> &'static str {
        match self {
            Cardinal::North => "norte",
            Cardinal::South => "sur",
            Cardinal::East => "este",
            Cardinal::West => "oeste",
        }
    }
}
