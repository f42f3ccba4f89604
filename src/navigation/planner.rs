// navigation/planner.rs

//! Obstacle-aware path generation. The planner walks from the start toward the
//! goal in fixed-length steps. A step landing in a hub is swung counter-clockwise
//! in small increments until it clears; a step landing in a barrier pushes the two
//! doorway points that lead around that barrier onto the goal stack, so the walk
//! first visits the doorways and then resumes toward the goal.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

use crate::core::field::{doorways, Barrier, ObstacleMap, FIELD_CENTER_X};
use crate::core::geometry::{normalize_angle, Point, Pose};
use crate::navigation::path::{Path, Waypoint};
use crate::NavError;

/// Planner tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Length of each step (inches)
    pub segment_length: f64,
    /// Bearing increment used to slide a step off a hub (radians)
    pub nudge_angle: f64,
    /// Steps and detours allowed per plan, across all detours
    pub max_iterations: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            segment_length: 1.0,
            nudge_angle: 0.01,
            max_iterations: 1000,
        }
    }
}

impl PlannerConfig {
    /// Rejects step settings that would stall the walk: the step length and the
    /// nudge increment must both be positive.
    pub fn validate(&self) -> Result<(), NavError> {
        if !(self.segment_length.is_finite() && self.segment_length > 0.0) {
            return Err(NavError::Config(format!(
                "planner.segment_length must be positive, got {}",
                self.segment_length
            )));
        }
        if !(self.nudge_angle.is_finite() && self.nudge_angle > 0.0) {
            return Err(NavError::Config(format!(
                "planner.nudge_angle must be positive, got {}",
                self.nudge_angle
            )));
        }
        Ok(())
    }
}

/// Generates obstacle-free waypoint sequences on the field.
#[derive(Debug, Clone, Default)]
pub struct PathPlanner {
    map: ObstacleMap,
    config: PlannerConfig,
}

impl PathPlanner {
    /// Planner over the field's obstacle map.
    pub fn new(config: PlannerConfig) -> Self {
        PathPlanner {
            map: ObstacleMap::new(),
            config,
        }
    }

    /// The obstacle map being planned against.
    pub fn map(&self) -> &ObstacleMap {
        &self.map
    }

    /// The active tuning.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans from `start` to `goal`.
    ///
    /// The result begins with `start` and ends with `goal`; every point in
    /// between lies outside all obstacles and carries the start heading. Barrier
    /// doorways appear exactly as waypoints. A config with a non-positive step
    /// or nudge is refused with [`NavError::Config`].
    pub fn plan(&self, start: Pose, goal: Pose) -> Result<Path, NavError> {
        self.config.validate()?;
        let points = self.walk(start.location, goal.location)?;
        debug!(
            "Planned {} -> {} in {} points",
            start.location,
            goal.location,
            points.len() + 2
        );

        let mut path = Path::new();
        path.push(start);
        for p in points {
            path.push(Pose::new(p, start.heading()));
        }
        path.push(Waypoint::new(goal));
        Ok(path)
    }

    /// Intermediate points from `start` to `goal`, both excluded.
    fn walk(&self, start: Point, goal: Point) -> Result<Vec<Point>, NavError> {
        let seg = self.config.segment_length;
        let failed = |iterations| {
            warn!("Planning {} -> {} failed after {} iterations", start, goal, iterations);
            NavError::PlanningFailed {
                start,
                goal,
                iterations,
            }
        };

        let mut points: Vec<Point> = Vec::new();
        let mut targets: Vec<Point> = vec![goal];
        let mut iterations = 0;

        while let Some(&target) = targets.last() {
            let current = points.last().copied().unwrap_or(start);

            if current.distance_to(target) < seg {
                targets.pop();
                // Doorways are kept exactly; the final goal is appended by the caller.
                if !targets.is_empty() {
                    points.push(target);
                }
                continue;
            }

            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(failed(iterations - 1));
            }

            let mut bearing = current.bearing_to(target);
            let mut candidate = current.step_toward(bearing, seg);
            let mut swept = 0.0;
            while self.map.in_hub(candidate) {
                bearing += self.config.nudge_angle;
                swept += self.config.nudge_angle;
                if swept >= TAU {
                    return Err(failed(iterations));
                }
                candidate = current.step_toward(bearing, seg);
            }
            let bearing = normalize_angle(bearing);

            match self.map.barrier_at(candidate) {
                Some(barrier) => {
                    let (first, second) = detour(barrier, candidate, bearing);
                    debug!("Detouring around {:?} via {} and {}", barrier, first, second);
                    targets.push(second);
                    targets.push(first);
                }
                None => points.push(candidate),
            }
        }

        Ok(points)
    }
}

/// The two doorways, in visiting order, that route around `barrier` for a step
/// that hit it at `candidate` while travelling along `bearing`.
fn detour(barrier: Barrier, candidate: Point, bearing: f64) -> (Point, Point) {
    match barrier {
        Barrier::Horizontal => {
            let (low, high) = if candidate.x > FIELD_CENTER_X {
                (doorways::H_RIGHT_LOW, doorways::H_RIGHT_HIGH)
            } else {
                (doorways::H_LEFT_LOW, doorways::H_LEFT_HIGH)
            };
            if bearing > 0.0 { (low, high) } else { (high, low) }
        }
        Barrier::VerticalLeft => {
            if bearing.abs() < FRAC_PI_2 {
                (doorways::VL_WEST, doorways::VL_EAST)
            } else {
                (doorways::VL_EAST, doorways::VL_WEST)
            }
        }
        Barrier::VerticalRight => {
            if bearing.abs() > FRAC_PI_2 {
                (doorways::VR_EAST, doorways::VR_WEST)
            } else {
                (doorways::VR_WEST, doorways::VR_EAST)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::HUB_CENTERS;
    use rstest::rstest;

    fn planner() -> PathPlanner {
        PathPlanner::new(PlannerConfig::default())
    }

    fn assert_clear(path: &Path) {
        let map = ObstacleMap::new();
        let n = path.len();
        for w in path.iter().skip(1).take(n.saturating_sub(2)) {
            assert!(!map.contains(w.location()), "{} is inside an obstacle", w);
        }
    }

    #[test]
    fn open_field_walks_straight() {
        let path = planner()
            .plan(Pose::from_xy(20.0, 20.0, 0.0), Pose::from_xy(20.0, 30.5, 1.0))
            .unwrap();
        assert_eq!(path.len(), 12);
        assert!(path.iter().all(|w| (w.location().x - 20.0).abs() < 1e-9));
        assert_eq!(path.last().unwrap().pose.heading(), 1.0);
        assert_eq!(path.get(5).unwrap().pose.heading(), 0.0);
    }

    #[test]
    fn goal_within_one_segment_is_appended_directly() {
        let path = planner()
            .plan(Pose::from_xy(20.0, 20.0, 0.0), Pose::from_xy(20.5, 20.0, 0.0))
            .unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn hub_in_the_way_is_skirted() {
        let path = planner()
            .plan(Pose::from_xy(30.0, 60.0, 0.0), Pose::from_xy(66.0, 60.0, 0.0))
            .unwrap();
        assert_clear(&path);
        let hub = HUB_CENTERS[1];
        assert!(path.iter().any(|w| w.location().distance_to(hub) < 14.0));
        assert_eq!(path.last().unwrap().location(), Point::new(66.0, 60.0));
    }

    #[rstest]
    #[case(Point::new(20.0, 80.0), Point::new(20.0, 115.0), [doorways::H_LEFT_LOW, doorways::H_LEFT_HIGH])]
    #[case(Point::new(20.0, 115.0), Point::new(20.0, 80.0), [doorways::H_LEFT_HIGH, doorways::H_LEFT_LOW])]
    #[case(Point::new(120.0, 80.0), Point::new(120.0, 115.0), [doorways::H_RIGHT_LOW, doorways::H_RIGHT_HIGH])]
    #[case(Point::new(30.0, 115.0), Point::new(60.0, 105.0), [doorways::VL_WEST, doorways::VL_EAST])]
    #[case(Point::new(115.0, 115.0), Point::new(85.0, 115.0), [doorways::VR_EAST, doorways::VR_WEST])]
    fn barriers_route_through_doorways_in_order(
        #[case] start: Point,
        #[case] goal: Point,
        #[case] expected: [Point; 2],
    ) {
        let path = planner()
            .plan(Pose::new(start, 0.0), Pose::new(goal, 0.0))
            .unwrap();
        assert_clear(&path);
        let first = path.iter().position(|w| w.location() == expected[0]);
        let second = path.iter().position(|w| w.location() == expected[1]);
        match (first, second) {
            (Some(a), Some(b)) => assert!(a < b, "doorways visited out of order"),
            _ => panic!("doorways missing from {:?}", path),
        }
    }

    #[test]
    fn goal_inside_barrier_exhausts_budget() {
        let result = planner().plan(Pose::from_xy(20.0, 80.0, 0.0), Pose::from_xy(60.0, 96.0, 0.0));
        assert!(matches!(result, Err(NavError::PlanningFailed { .. })));
    }

    #[test]
    fn budget_is_shared_across_detours() {
        let tight = PathPlanner::new(PlannerConfig {
            max_iterations: 30,
            ..PlannerConfig::default()
        });
        let result = tight.plan(Pose::from_xy(20.0, 80.0, 0.0), Pose::from_xy(20.0, 115.0, 0.0));
        match result {
            Err(NavError::PlanningFailed { iterations, .. }) => assert_eq!(iterations, 30),
            other => panic!("expected planning failure, got {:?}", other),
        }
    }

    #[test]
    fn start_surrounded_by_hub_fails_instead_of_spinning() {
        let result = planner().plan(Pose::new(HUB_CENTERS[0], 0.0), Pose::from_xy(72.0, 80.0, 0.0));
        assert!(matches!(result, Err(NavError::PlanningFailed { .. })));
    }

    #[rstest]
    #[case(0.0, 0.01)]
    #[case(-1.0, 0.01)]
    #[case(1.0, 0.0)]
    #[case(1.0, -0.01)]
    #[case(f64::NAN, 0.01)]
    fn stalling_step_settings_are_refused(#[case] segment_length: f64, #[case] nudge_angle: f64) {
        let planner = PathPlanner::new(PlannerConfig {
            segment_length,
            nudge_angle,
            ..PlannerConfig::default()
        });
        let result = planner.plan(Pose::from_xy(30.0, 60.0, 0.0), Pose::from_xy(66.0, 60.0, 0.0));
        assert!(matches!(result, Err(NavError::Config(_))), "got {:?}", result);
    }
}
