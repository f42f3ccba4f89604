// navigation/optimizer.rs

//! Two passes that shrink planner output. The collinearity pass drops points that
//! lie on a straight run, as long as the merged chord stays clear of obstacles;
//! the shortcut pass replans between pairs of remaining points and splices in
//! any direct route that is shorter than the original stretch. Labelled
//! waypoints are never removed by either pass.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::field::ObstacleMap;
use crate::core::geometry::angle_difference;
use crate::navigation::path::{polyline_length, Path, Waypoint};
use crate::navigation::planner::{PathPlanner, PlannerConfig};

/// Points closer than this are treated as the same location.
const COINCIDENT: f64 = 1e-6;

/// Sample spacing when checking that a merged chord stays clear (inches).
pub const CLEARANCE_SPACING: f64 = 0.25;

/// Optimizer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Largest bearing drift still treated as a straight run (radians)
    pub collinear_tolerance: f64,
    /// Fractional saving that makes a shortcut preferred over a nearer one
    pub significant_margin: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            collinear_tolerance: 0.01,
            significant_margin: 0.3,
        }
    }
}

/// Runs the collinearity pass followed by the shortcut pass.
#[derive(Debug, Clone, Default)]
pub struct PathOptimizer {
    planner: PathPlanner,
    config: OptimizerConfig,
}

impl PathOptimizer {
    /// Optimizer whose shortcut candidates are planned with `planner`.
    pub fn new(planner: PathPlanner, config: OptimizerConfig) -> Self {
        PathOptimizer { planner, config }
    }

    /// Builds the planner from its config.
    pub fn with_configs(planner: PlannerConfig, optimizer: OptimizerConfig) -> Self {
        PathOptimizer::new(PathPlanner::new(planner), optimizer)
    }

    /// The planner used for candidate shortcuts.
    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    /// Collinearity pass, then shortcut pass.
    pub fn optimize(&self, path: &Path) -> Path {
        let reduced = reduce_collinear(path, self.config.collinear_tolerance);
        let shortened = shortcut(&self.planner, &reduced, &self.config);
        debug!(
            "Optimized path: {} -> {} -> {} points, length {:.2} -> {:.2}",
            path.len(),
            reduced.len(),
            shortened.len(),
            path.length(),
            shortened.length()
        );
        shortened
    }
}

/// Total length of the polyline through `path`.
pub fn path_length(path: &Path) -> f64 {
    path.length()
}

/// Removes points lying on straight runs, keeping the first, the last and every
/// labelled waypoint.
///
/// A point goes only when the path barely turns there and the chord that
/// replaces it is clear of every obstacle, so the result never cuts a corner the
/// input went around. The sweep is repeated until it stops removing points,
/// which makes the pass idempotent.
pub fn reduce_collinear(path: &Path, tolerance: f64) -> Path {
    let map = ObstacleMap::new();
    let mut current: Vec<Waypoint> = path.iter().cloned().collect();
    loop {
        let next = collinear_sweep(&merge_coincident(&current), tolerance, &map);
        if next.len() == current.len() {
            return next.into_iter().collect();
        }
        current = next;
    }
}

/// Collapses runs of consecutive points at the same location. Both path ends
/// and every label survive.
fn merge_coincident(points: &[Waypoint]) -> Vec<Waypoint> {
    let mut out: Vec<Waypoint> = Vec::with_capacity(points.len());
    let n = points.len();
    for (i, w) in points.iter().enumerate() {
        let is_last = i + 1 == n;
        let Some(prev) = out.last() else {
            out.push(w.clone());
            continue;
        };
        if !prev.location().approx_eq(w.location(), COINCIDENT) {
            out.push(w.clone());
            continue;
        }

        let prev_is_first = out.len() == 1;
        let prev_labelled = prev.label.is_some();
        if !prev_is_first && !prev_labelled {
            // Same spot; the later waypoint may be the goal or carry a label.
            if let Some(slot) = out.last_mut() {
                *slot = w.clone();
            }
        } else if is_last || w.label.is_some() {
            out.push(w.clone());
        }
    }
    out
}

/// One pass over the path. Each point is compared against the last point kept:
/// it is dropped when the direction into it matches the direction out of it
/// and the chord from the last kept point to its successor is clear.
fn collinear_sweep(points: &[Waypoint], tolerance: f64, map: &ObstacleMap) -> Vec<Waypoint> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }

    let mut out = vec![points[0].clone()];
    for i in 1..n - 1 {
        let here = &points[i];
        if here.label.is_some() {
            out.push(here.clone());
            continue;
        }

        let anchor = out.last().map_or(points[0].location(), Waypoint::location);
        let next = points[i + 1].location();
        let incoming = anchor.bearing_to(here.location());
        let outgoing = here.location().bearing_to(next);
        let straight = angle_difference(outgoing, incoming).abs() <= tolerance;
        if !straight || !map.segment_is_clear(anchor, next, CLEARANCE_SPACING) {
            out.push(here.clone());
        }
    }
    out.push(points[n - 1].clone());
    out
}

/// Replaces stretches of the path with shorter direct replans.
///
/// From each kept point the pass scans forward to the next labelled waypoint
/// (or the end), replanning directly to every candidate. The furthest candidate
/// whose replan saves at least `significant_margin` of the original stretch is
/// preferred, then the furthest with any saving. With no saving the next
/// original point is kept as is, so the result is never longer than the input.
pub fn shortcut(planner: &PathPlanner, path: &Path, config: &OptimizerConfig) -> Path {
    let p: Vec<Waypoint> = path.iter().cloned().collect();
    let n = p.len();
    if n <= 2 {
        return path.clone();
    }

    let mut out = vec![p[0].clone()];
    let mut i = 0;
    while i < n - 1 {
        let limit = (i + 1..n - 1)
            .find(|&k| p[k].label.is_some())
            .unwrap_or(n - 1);

        let mut best: Option<(usize, Path)> = None;
        let mut significant: Option<(usize, Path)> = None;
        for j in i + 1..=limit {
            let original = polyline_length(p[i..=j].iter().map(Waypoint::location));
            let Ok(replan) = planner.plan(p[i].pose, p[j].pose) else {
                continue;
            };
            let replan = reduce_collinear(&replan, config.collinear_tolerance);
            let replanned = replan.length();
            if replanned <= original * (1.0 - config.significant_margin) && replanned < original {
                significant = Some((j, replan.clone()));
            }
            if replanned < original {
                best = Some((j, replan));
            }
        }

        match significant.or(best) {
            Some((j, replan)) => {
                let inner = replan.len().saturating_sub(2);
                out.extend(replan.into_iter().skip(1).take(inner));
                out.push(p[j].clone());
                i = j;
            }
            None => {
                out.push(p[i + 1].clone());
                i += 1;
            }
        }
    }

    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::{HUB_CENTERS, HUB_EXCLUSION_RADIUS};
    use crate::core::geometry::{Point, Pose};

    fn path_of(points: &[(f64, f64)]) -> Path {
        points.iter().map(|&(x, y)| Pose::from_xy(x, y, 0.0)).collect()
    }

    fn locations(path: &Path) -> Vec<Point> {
        path.points().collect()
    }

    #[test]
    fn straight_run_collapses_to_endpoints() {
        let path = path_of(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0), (0.0, 3.0)]);
        let reduced = reduce_collinear(&path, 0.01);
        assert_eq!(locations(&reduced), vec![Point::new(0.0, 0.0), Point::new(0.0, 3.0)]);
    }

    #[test]
    fn corner_is_kept() {
        let path = path_of(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)]);
        let reduced = reduce_collinear(&path, 0.01);
        assert_eq!(
            locations(&reduced),
            vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(2.0, 2.0)]
        );
    }

    #[test]
    fn bend_at_final_point_is_kept() {
        let path = path_of(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0)]);
        let reduced = reduce_collinear(&path, 0.01);
        assert_eq!(
            locations(&reduced),
            vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(2.0, 1.0)]
        );
    }

    #[test]
    fn labels_survive_reduction() {
        let mut path = path_of(&[(0.0, 0.0), (0.0, 1.0)]);
        path.push(Waypoint::labelled(Pose::from_xy(0.0, 2.0, 0.0), "POI drop"));
        path.push(Pose::from_xy(0.0, 3.0, 0.0));
        let reduced = reduce_collinear(&path, 0.01);
        assert_eq!(reduced.len(), 3);
        assert_eq!(reduced.get(1).unwrap().label.as_deref(), Some("POI drop"));
    }

    #[test]
    fn wraparound_bearings_compare_as_equal() {
        // Heading due west, the bearing flips between +pi and -pi.
        let path = path_of(&[(10.0, 0.0), (9.0, 1e-9), (8.0, -1e-9), (7.0, 0.0)]);
        assert_eq!(reduce_collinear(&path, 0.01).len(), 2);
    }

    #[test]
    fn two_point_paths_are_left_alone() {
        let path = path_of(&[(0.0, 0.0), (50.0, 50.0)]);
        let planner = PathPlanner::default();
        assert_eq!(shortcut(&planner, &path, &OptimizerConfig::default()), path);
    }

    #[test]
    fn detour_is_shortcut() {
        let path = path_of(&[(20.0, 20.0), (20.0, 40.0), (40.0, 40.0), (40.0, 20.0), (30.0, 20.0)]);
        let shortened = shortcut(&PathPlanner::default(), &path, &OptimizerConfig::default());
        assert!(shortened.length() < path.length());
        assert_eq!(shortened.last().unwrap().location(), Point::new(30.0, 20.0));
        assert_eq!(shortened.len(), 2);
    }

    #[test]
    fn shortcut_stops_at_labelled_waypoints() {
        let mut path = path_of(&[(20.0, 20.0), (20.0, 40.0)]);
        path.push(Waypoint::labelled(Pose::from_xy(40.0, 40.0, 0.0), "POI corner"));
        path.push(Pose::from_xy(40.0, 20.0, 0.0));
        path.push(Pose::from_xy(30.0, 20.0, 0.0));
        let shortened = shortcut(&PathPlanner::default(), &path, &OptimizerConfig::default());
        assert!(shortened.iter().any(|w| w.is_poi()));
        assert!(shortened.length() <= path.length());
    }

    #[test]
    fn near_straight_bend_is_kept_when_the_chord_clips_a_barrier() {
        // The turn at the middle point is inside the tolerance, but the chord from
        // the first to the last point cuts the corner of the horizontal barrier.
        let clipping = path_of(&[(10.0, 99.0), (13.6, 99.6), (30.0, 101.0)]);
        assert_eq!(reduce_collinear(&clipping, 0.1).len(), 3);

        let open = path_of(&[(10.0, 39.0), (13.6, 39.6), (30.0, 41.0)]);
        assert_eq!(reduce_collinear(&open, 0.1).len(), 2);
    }

    #[test]
    fn arc_around_a_hub_is_not_flattened() {
        let planned = PathPlanner::default()
            .plan(Pose::from_xy(8.0, 24.0, 0.0), Pose::from_xy(102.53, 68.87, 0.0))
            .unwrap();
        let reduced = reduce_collinear(&planned, 0.01);
        assert!(reduced.len() > 2);
        assert_eq!(reduce_collinear(&reduced, 0.01), reduced);

        let points = locations(&reduced);
        for pair in points.windows(2) {
            for hub in HUB_CENTERS {
                assert!(
                    distance_to_segment(hub, pair[0], pair[1]) > HUB_EXCLUSION_RADIUS - 0.05,
                    "{} -> {} passes through the hub at {}",
                    pair[0],
                    pair[1],
                    hub
                );
            }
        }
    }

    fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len2 = dx * dx + dy * dy;
        let t = if len2 == 0.0 {
            0.0
        } else {
            (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
        };
        p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
    }
}
