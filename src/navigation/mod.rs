//! Navigation for the field robot
//!
//! This module plans obstacle-free routes, shrinks them, and follows them with
//! closed-loop mecanum drive control. The [`Navigator`] holds the active path and
//! sequences travel between points of interest; teleop input bypasses the path.

pub mod controller;
pub mod optimizer;
pub mod path;
pub mod planner;
pub mod routines;

pub use controller::{
    mecanum_powers, Completion, Dpad, DriveConfig, DriveController, DriveTask, Progress,
    RotateTask, StickInput, TeleopConfig, TranslateTask,
};
pub use optimizer::{path_length, reduce_collinear, shortcut, OptimizerConfig, PathOptimizer};
pub use path::{Path, Waypoint};
pub use planner::{PathPlanner, PlannerConfig};
pub use routines::Routine;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::geometry::Pose;
use crate::core::hardware::{Drivetrain, WheelPowers};
use crate::core::{Robot, StopSignal};
use crate::{NavConfig, NavError};

/// Which hardcoded routine the navigator starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// Carousel-side autonomous routine
    Duck,
    /// Warehouse-side autonomous routine
    Freight,
    /// Driver control; no preset path
    Teleop,
}

impl FromStr for NavigationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duck" => Ok(NavigationMode::Duck),
            "freight" => Ok(NavigationMode::Freight),
            "teleop" => Ok(NavigationMode::Teleop),
            other => Err(format!("unknown mode '{}', expected duck, freight or teleop", other)),
        }
    }
}

/// Alliance side; red routines are mirrored across the field centerline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllianceColor {
    /// Routines as authored
    Blue,
    /// Routines reflected about x = 72
    Red,
}

impl FromStr for AllianceColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blue" => Ok(AllianceColor::Blue),
            "red" => Ok(AllianceColor::Red),
            other => Err(format!("unknown alliance '{}', expected blue or red", other)),
        }
    }
}

/// Result of advancing travel.
#[derive(Debug, Clone, PartialEq)]
pub enum TravelStatus {
    /// Still heading for the front waypoint
    Travelling,
    /// A point of interest was reached and removed from the path
    ReachedPoi(Waypoint),
    /// No waypoints remain
    PathComplete,
    /// The stop signal interrupted travel; the current waypoint is kept
    Cancelled,
}

/// Snapshot of the navigator's remaining work.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationStatus {
    /// Active routine
    pub mode: NavigationMode,
    /// Active alliance
    pub alliance: AllianceColor,
    /// Waypoints left to visit
    pub remaining_waypoints: usize,
    /// Polyline length through the remaining waypoints
    pub remaining_length: f64,
    /// Label of the next point of interest
    pub next_poi: Option<String>,
}

impl fmt::Display for NavigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}: {} waypoints, {:.1} in, next {}",
            self.mode,
            self.alliance,
            self.remaining_waypoints,
            self.remaining_length,
            self.next_poi.as_deref().unwrap_or("-")
        )
    }
}

/// Leg of the front waypoint currently being driven.
#[derive(Debug, Clone)]
enum Leg {
    Rotate(RotateTask),
    Translate(TranslateTask),
}

/// Holds the planned path and drives the robot along it.
pub struct Navigator {
    mode: NavigationMode,
    alliance: AllianceColor,
    start: Pose,
    path: Path,
    optimizer: PathOptimizer,
    controller: DriveController,
    leg: Option<Leg>,
}

impl Navigator {
    /// Navigator loaded with the routine for `mode`, mirrored for red.
    pub fn new(mode: NavigationMode, alliance: AllianceColor, config: &NavConfig) -> Self {
        let routine = routines::routine(mode, alliance);
        log::info!(
            "Loaded {} routine for {:?}: {} waypoints from {}",
            routine.name,
            alliance,
            routine.path.len(),
            routine.start
        );
        Navigator {
            mode,
            alliance,
            start: routine.start,
            path: routine.path,
            optimizer: PathOptimizer::with_configs(config.planner, config.optimizer),
            controller: DriveController::new(config.drive, config.teleop),
            leg: None,
        }
    }

    /// Where the loaded routine expects the robot to be placed.
    pub fn start_pose(&self) -> Pose {
        self.start
    }

    /// The remaining path, front first.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The drive controller in use.
    pub fn controller(&self) -> &DriveController {
        &self.controller
    }

    /// Appends a waypoint to the end of the path.
    pub fn add_waypoint(&mut self, waypoint: impl Into<Waypoint>) {
        self.path.push(waypoint);
    }

    /// Inserts a waypoint before `index`.
    pub fn insert_waypoint(&mut self, index: usize, waypoint: impl Into<Waypoint>) {
        if index == 0 {
            self.leg = None;
        }
        self.path.insert(index, waypoint);
    }

    /// Drops every remaining waypoint.
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.leg = None;
    }

    /// Plans and optimizes a route from `start` to `goal` and appends it, minus
    /// the start point, to the path. The goal keeps its label. Returns the
    /// number of waypoints added.
    pub fn plan_route(&mut self, start: Pose, goal: impl Into<Waypoint>) -> Result<usize, NavError> {
        let goal = goal.into();
        let planned = self.optimizer.planner().plan(start, goal.pose)?;
        let optimized = self.optimizer.optimize(&planned);

        let count = optimized.len().saturating_sub(1);
        let mut route: Vec<Waypoint> = optimized.into_iter().skip(1).collect();
        if let Some(last) = route.last_mut() {
            last.label = goal.label.clone();
        }
        for waypoint in route {
            self.path.push(waypoint);
        }

        log::info!(
            "Planned route {} -> {}: {} waypoints",
            start.location,
            goal,
            count
        );
        Ok(count)
    }

    /// Cooperative travel step. Call once per control tick after refreshing the
    /// robot's pose: rotates to the front waypoint's heading, then drives to it,
    /// and removes it once reached.
    pub fn tick<D: Drivetrain>(&mut self, robot: &mut Robot<D>) -> TravelStatus {
        let Some(front) = self.path.front() else {
            self.leg = None;
            return TravelStatus::PathComplete;
        };

        let controller = &self.controller;
        let leg = self
            .leg
            .get_or_insert_with(|| Leg::Rotate(controller.rotate_to(front.pose.heading())));

        match leg {
            Leg::Rotate(task) => {
                if task.tick(robot) == Progress::Converged {
                    *leg = Leg::Translate(controller.translate_to(front.location()));
                }
                TravelStatus::Travelling
            }
            Leg::Translate(task) => {
                if task.tick(robot) != Progress::Converged {
                    return TravelStatus::Travelling;
                }
                self.leg = None;
                match self.path.pop_front() {
                    Some(reached) => self.arrived(robot, reached),
                    None => TravelStatus::PathComplete,
                }
            }
        }
    }

    /// Blocking travel: follows the path until a point of interest is reached,
    /// the path runs out, or `stop` is raised.
    pub fn travel_to_next_poi<D: Drivetrain>(
        &mut self,
        robot: &mut Robot<D>,
        stop: &StopSignal,
    ) -> Result<TravelStatus, NavError> {
        if self.path.is_empty() {
            return Err(NavError::EmptyPath);
        }
        self.leg = None;

        while let Some(target) = self.path.front().cloned() {
            robot.emit("next waypoint", &target.to_string());

            let rotated = self.controller.rotate(target.pose.heading(), robot, stop)?;
            if rotated == Completion::Cancelled {
                return Ok(TravelStatus::Cancelled);
            }
            let translated = self.controller.translate(target.location(), robot, stop)?;
            if translated == Completion::Cancelled {
                return Ok(TravelStatus::Cancelled);
            }

            self.path.pop_front();
            if let TravelStatus::ReachedPoi(poi) = self.arrived(robot, target) {
                return Ok(TravelStatus::ReachedPoi(poi));
            }
        }

        log::info!("Path complete at {}", robot.current_pose());
        Ok(TravelStatus::PathComplete)
    }

    /// Teleop passthrough; ignores the stored path.
    pub fn maneuver<D: Drivetrain>(&self, robot: &mut Robot<D>, input: &StickInput) -> WheelPowers {
        self.controller.maneuver(robot, input)
    }

    /// Remaining work.
    pub fn status(&self) -> NavigationStatus {
        NavigationStatus {
            mode: self.mode,
            alliance: self.alliance,
            remaining_waypoints: self.path.len(),
            remaining_length: self.path.length(),
            next_poi: self.path.next_poi().map(str::to_string),
        }
    }

    fn arrived<D: Drivetrain>(&self, robot: &mut Robot<D>, reached: Waypoint) -> TravelStatus {
        log::debug!("Reached {}", reached);
        if reached.is_poi() {
            log::info!("Arrived at {}", reached);
            robot.emit("point of interest", reached.label.as_deref().unwrap_or_default());
            TravelStatus::ReachedPoi(reached)
        } else if self.path.is_empty() {
            TravelStatus::PathComplete
        } else {
            TravelStatus::Travelling
        }
    }
}
