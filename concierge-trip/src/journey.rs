//! Simulated walk through DFW, from the Terminal D curb to gate A12, used to
//! demo live tracking without a phone in hand.

use std::time::Duration;

use concierge_core::geo::{walking_minutes, Coordinate, WalkingPace};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DfwWaypoint {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub instruction: &'static str,
}

impl DfwWaypoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

pub const DFW_WAYPOINTS: &[DfwWaypoint] = &[
    DfwWaypoint {
        name: "Terminal D Curbside",
        latitude: 32.8918,
        longitude: -97.0445,
        instruction: "Enter Terminal D through the doors by the American Airlines sign.",
    },
    DfwWaypoint {
        name: "Terminal D Check-in",
        latitude: 32.8922,
        longitude: -97.0432,
        instruction: "Check in at the American Airlines counter, or go straight to security if you have your boarding pass.",
    },
    DfwWaypoint {
        name: "Terminal D Security",
        latitude: 32.8927,
        longitude: -97.0421,
        instruction: "Go through the security checkpoint. Ask an officer if you need a chair.",
    },
    DfwWaypoint {
        name: "Skylink Station D",
        latitude: 32.8936,
        longitude: -97.0407,
        instruction: "Take the elevator up to the Skylink train and ride toward Terminal A.",
    },
    DfwWaypoint {
        name: "Skylink Station A",
        latitude: 32.9002,
        longitude: -97.0362,
        instruction: "Get off at Terminal A and follow the signs for gates A10 to A20.",
    },
    DfwWaypoint {
        name: "Gate A12",
        latitude: 32.9010,
        longitude: -97.0355,
        instruction: "You have arrived at gate A12. Find a seat near the podium.",
    },
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JourneySnapshot {
    pub progress: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub current_instruction: &'static str,
    pub next_waypoint: Option<&'static str>,
    pub distance_remaining_m: i64,
    pub eta_minutes: i64,
}

fn leg_lengths() -> Vec<f64> {
    DFW_WAYPOINTS
        .windows(2)
        .map(|pair| pair[0].coordinate().distance_to(&pair[1].coordinate()))
        .collect()
}

pub fn total_length_m() -> f64 {
    leg_lengths().iter().sum()
}

/// Where the walker is at `progress` (clamped to 0..=1), measured along the path,
/// together with the index of the waypoint last passed.
fn locate(progress: f64) -> (Coordinate, usize, f64) {
    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    let last = DFW_WAYPOINTS.len() - 1;
    if progress >= 1.0 {
        return (DFW_WAYPOINTS[last].coordinate(), last, progress);
    }
    let legs = leg_lengths();
    let total: f64 = legs.iter().sum();
    let mut remaining = progress * total;

    for (i, leg) in legs.iter().enumerate() {
        if remaining <= *leg && *leg > 0.0 {
            let from = DFW_WAYPOINTS[i].coordinate();
            let to = DFW_WAYPOINTS[i + 1].coordinate();
            let t = remaining / leg;
            // exact hit on a waypoint counts as having passed it
            let index = if t >= 1.0 { i + 1 } else { i };
            return (from.lerp(&to, t), index, progress);
        }
        remaining -= leg;
    }

    (DFW_WAYPOINTS[last].coordinate(), last, progress)
}

pub fn position_at(progress: f64) -> Coordinate {
    locate(progress).0
}

/// Position after `elapsed` of a walk that takes `duration` end to end.
pub fn position_at_elapsed(elapsed: Duration, duration: Duration) -> Coordinate {
    position_at(progress_of(elapsed, duration))
}

pub fn progress_of(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    elapsed.as_secs_f64() / duration.as_secs_f64()
}

pub fn snapshot(progress: f64) -> JourneySnapshot {
    let (position, index, progress) = locate(progress);
    let total = total_length_m();
    let remaining = (total * (1.0 - progress)).max(0.0);

    JourneySnapshot {
        progress,
        latitude: position.latitude,
        longitude: position.longitude,
        current_instruction: DFW_WAYPOINTS[index].instruction,
        next_waypoint: DFW_WAYPOINTS.get(index + 1).map(|w| w.name),
        distance_remaining_m: remaining.round() as i64,
        eta_minutes: if remaining < 1.0 { 0 } else { walking_minutes(remaining, WalkingPace::Elderly) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(position_at(0.0), DFW_WAYPOINTS[0].coordinate());
        assert_eq!(position_at(1.0), DFW_WAYPOINTS[5].coordinate());
        assert_eq!(position_at(-3.0), position_at(0.0));
        assert_eq!(position_at(7.0), position_at(1.0));

        let done = snapshot(1.0);
        assert_eq!(done.next_waypoint, None);
        assert_eq!(done.eta_minutes, 0);
        assert_eq!(done.distance_remaining_m, 0);
        assert!(done.current_instruction.starts_with("You have arrived at gate A12"));
    }

    #[test]
    fn test_interpolates_by_path_length() {
        let total = total_length_m();
        let halfway = snapshot(0.5);
        assert_eq!(halfway.distance_remaining_m, (total / 2.0).round() as i64);

        // the Skylink leg is by far the longest, so the midpoint lies on it
        assert_eq!(halfway.next_waypoint, Some("Skylink Station A"));
        assert!(halfway.current_instruction.contains("Skylink train"));

        let start = snapshot(0.0);
        assert_eq!(start.next_waypoint, Some("Terminal D Check-in"));
        assert_eq!(start.eta_minutes, walking_minutes(total, WalkingPace::Elderly));
    }

    #[test]
    fn test_elapsed_progress() {
        let duration = Duration::from_secs(120);
        assert_eq!(progress_of(Duration::from_secs(30), duration), 0.25);
        assert_eq!(position_at_elapsed(Duration::from_secs(500), duration), position_at(1.0));
        assert_eq!(progress_of(Duration::from_secs(5), Duration::ZERO), 1.0);
    }
}
