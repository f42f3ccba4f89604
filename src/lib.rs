//! Mecanum Nav - path planning and drive control for a mecanum field robot
//!
//! This library plans obstacle-free routes across a fixed competition field,
//! optimizes them, tracks the robot's pose by dead reckoning from wheel encoders,
//! and drives a four-wheel mecanum base along the result with closed-loop
//! rotate/translate primitives. Teleoperation maps joystick input straight to
//! wheel powers.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod core;
pub mod navigation;

// Re-export commonly used items for easier access
pub use crate::core::{
    DriveGeometry, Drivetrain, HardwareError, ObstacleMap, Point, Pose, PoseTracker, Robot,
    SimulatedDrivetrain, StopSignal, Telemetry, Wheel, WheelPowers,
};
pub use crate::navigation::{
    AllianceColor, DriveConfig, DriveController, NavigationMode, NavigationStatus, Navigator,
    OptimizerConfig, Path, PathOptimizer, PathPlanner, PlannerConfig, StickInput, TeleopConfig,
    TravelStatus, Waypoint,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Path planner tuning
    pub planner: PlannerConfig,
    /// Path optimizer tuning
    pub optimizer: OptimizerConfig,
    /// Closed-loop drive tuning
    pub drive: DriveConfig,
    /// Joystick handling
    pub teleop: TeleopConfig,
    /// Drivetrain dimensions
    pub geometry: DriveGeometry,
}

impl NavConfig {
    /// Parses a YAML document; missing fields take their defaults. The result
    /// is validated before it is returned.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, NavError> {
        let config: NavConfig =
            serde_yaml::from_str(yaml).map_err(|e| NavError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that would otherwise hang or misbehave at run time.
    pub fn validate(&self) -> Result<(), NavError> {
        self.planner.validate()
    }

    /// Reads and parses a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, NavError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}

/// Navigation error types
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// No route was found within the iteration budget
    #[error("no path from {start} to {goal} after {iterations} iterations")]
    PlanningFailed {
        /// Where planning started
        start: Point,
        /// Where planning was headed
        goal: Point,
        /// Iterations spent before giving up
        iterations: usize,
    },
    /// A blocking drive primitive ran past its time limit
    #[error("drive did not converge within {elapsed:?}")]
    ConvergenceTimeout {
        /// Time spent before giving up
        elapsed: Duration,
    },
    /// The hardware reported a fault
    #[error("sensor fault: {0}")]
    SensorFault(#[from] HardwareError),
    /// Travel was requested with no waypoints left
    #[error("no waypoints left to travel")]
    EmptyPath,
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = NavConfig::from_yaml_str("drive:\n  cruise_power: 0.5\nplanner:\n  max_iterations: 200\n")
            .unwrap();
        assert_eq!(config.drive.cruise_power, 0.5);
        assert_eq!(config.drive.min_power, DriveConfig::default().min_power);
        assert_eq!(config.planner.max_iterations, 200);
        assert_eq!(config.geometry, DriveGeometry::default());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = NavConfig::from_yaml_str("drive: [1, 2").unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }

    #[test]
    fn zero_nudge_angle_is_rejected_on_load() {
        let err = NavConfig::from_yaml_str("planner:\n  nudge_angle: 0.0\n").unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
        assert!(err.to_string().contains("nudge_angle"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = NavConfig::from_yaml_file("/nonexistent/mecanum_nav.yaml").unwrap_err();
        assert!(err.to_string().contains("mecanum_nav.yaml"));
    }

    #[test]
    fn hardware_errors_convert_to_sensor_faults() {
        let err: NavError = HardwareError::EncoderReset {
            wheel: Wheel::RearLeft,
            reason: "timeout".into(),
        }
        .into();
        assert_eq!(err.to_string(), "sensor fault: encoder reset failed on rear_left: timeout");
    }
}
