// navigation/routines.rs

//! Hardcoded autonomous routines, laid out for the blue alliance. Red routines
//! are the blue ones reflected across the field centerline.

use crate::core::field::mirror_pose;
use crate::core::geometry::Pose;
use crate::navigation::path::{Path, Waypoint};
use crate::navigation::{AllianceColor, NavigationMode};

/// A start pose and the waypoints to follow from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    /// Short name used in logs
    pub name: &'static str,
    /// Where the robot is placed before the match
    pub start: Pose,
    /// Waypoints in travel order
    pub path: Path,
}

impl Routine {
    /// This routine reflected for the other alliance.
    pub fn mirrored(&self) -> Routine {
        Routine {
            name: self.name,
            start: mirror_pose(self.start),
            path: self.path.map_poses(mirror_pose),
        }
    }
}

fn waypoint(x: f64, y: f64, label: Option<&str>) -> Waypoint {
    let pose = Pose::from_xy(x, y, 0.0);
    match label {
        Some(label) => Waypoint::labelled(pose, label),
        None => Waypoint::new(pose),
    }
}

/// Carousel side: spin the duck, score at the alliance hub, park in storage.
pub fn duck() -> Routine {
    Routine {
        name: "duck",
        start: Pose::from_xy(12.0, 36.0, 0.0),
        path: [
            waypoint(12.0, 12.0, Some("POI carousel")),
            waypoint(24.0, 40.0, None),
            waypoint(34.0, 50.0, Some("POI alliance hub")),
            waypoint(30.0, 30.0, None),
            waypoint(36.0, 12.0, Some("POI storage unit")),
        ]
        .into_iter()
        .collect(),
    }
}

/// Warehouse side: preload to the hub, cycle one freight through the left
/// barrier gap, park in the warehouse.
pub fn freight() -> Routine {
    Routine {
        name: "freight",
        start: Pose::from_xy(12.0, 80.0, 0.0),
        path: [
            waypoint(34.0, 66.0, Some("POI alliance hub")),
            waypoint(8.0, 88.0, None),
            waypoint(8.0, 108.0, None),
            waypoint(24.0, 120.0, Some("POI warehouse")),
            waypoint(8.0, 108.0, None),
            waypoint(8.0, 88.0, None),
            waypoint(34.0, 66.0, Some("POI alliance hub")),
            waypoint(8.0, 88.0, None),
            waypoint(8.0, 108.0, None),
            waypoint(30.0, 116.0, Some("POI park warehouse")),
        ]
        .into_iter()
        .collect(),
    }
}

/// The routine for `mode` as seen from `alliance`. Teleop has no path and
/// starts at the blue duck position.
pub fn routine(mode: NavigationMode, alliance: AllianceColor) -> Routine {
    let blue = match mode {
        NavigationMode::Duck => duck(),
        NavigationMode::Freight => freight(),
        NavigationMode::Teleop => Routine {
            name: "teleop",
            start: duck().start,
            path: Path::new(),
        },
    };
    match alliance {
        AllianceColor::Blue => blue,
        AllianceColor::Red => blue.mirrored(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::ObstacleMap;
    use rstest::rstest;

    #[rstest]
    #[case(NavigationMode::Duck, AllianceColor::Blue)]
    #[case(NavigationMode::Duck, AllianceColor::Red)]
    #[case(NavigationMode::Freight, AllianceColor::Blue)]
    #[case(NavigationMode::Freight, AllianceColor::Red)]
    fn every_leg_is_obstacle_free(#[case] mode: NavigationMode, #[case] alliance: AllianceColor) {
        let map = ObstacleMap::new();
        let r = routine(mode, alliance);
        let mut from = r.start.location;
        for w in r.path.iter() {
            assert!(
                map.segment_is_clear(from, w.location(), 0.25),
                "{} leg {} -> {} is blocked",
                r.name,
                from,
                w.location()
            );
            from = w.location();
        }
    }

    #[test]
    fn red_routines_mirror_blue() {
        let blue = duck();
        let red = routine(NavigationMode::Duck, AllianceColor::Red);
        assert_eq!(red.start.location.x, 144.0 - blue.start.location.x);
        assert_eq!(red.path.len(), blue.path.len());
        assert_eq!(red.path.next_poi(), Some("POI carousel"));
    }

    #[test]
    fn routines_end_on_a_poi() {
        for r in [duck(), freight()] {
            assert!(r.path.last().is_some_and(Waypoint::is_poi), "{}", r.name);
        }
        assert!(routine(NavigationMode::Teleop, AllianceColor::Blue).path.is_empty());
    }
}
