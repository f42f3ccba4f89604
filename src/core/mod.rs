// core/mod.rs

//! Declares the robot-side building blocks (geometry, field layout, hardware
//! boundary, dead reckoning, simulator) and the `Robot` context that ties the
//! drivetrain, the pose estimate and telemetry together for the navigation layer.

pub mod field;
pub mod geometry;
pub mod hardware;
pub mod localization;
pub mod simulation;

pub use field::{mirror_point, mirror_pose, Barrier, Obstacle, ObstacleMap};
pub use geometry::{angle_difference, normalize_angle, Point, Pose};
pub use hardware::{
    Drivetrain, DrivetrainExt, HardwareError, LogTelemetry, Telemetry, TelemetryBuffer, Wheel,
    WheelPowers,
};
pub use localization::{DriveGeometry, MecanumKinematics, PoseTracker};
pub use simulation::SimulatedDrivetrain;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operator stop request shared between the control loop and whoever may cancel it
/// (a Ctrl-C handler, another thread, a test).
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    /// A signal that has not been raised.
    pub fn new() -> Self {
        StopSignal::default()
    }

    /// Requests that running loops stop at their next check.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// True once [`StopSignal::raise`] has been called on any clone.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Everything a control primitive needs from the robot: the drivetrain it
/// commands, the pose estimate it reads and the telemetry sink it reports to.
///
/// The pose estimate lives here rather than in a global; it is written only
/// through [`Robot::update_pose`] and [`Robot::reset_pose`].
pub struct Robot<D: Drivetrain> {
    drivetrain: D,
    tracker: PoseTracker,
    telemetry: Box<dyn Telemetry>,
}

impl<D: Drivetrain> Robot<D> {
    /// Robot at `start`, reporting telemetry through the `log` facade.
    pub fn new(drivetrain: D, start: Pose, geometry: DriveGeometry) -> Self {
        Robot {
            drivetrain,
            tracker: PoseTracker::new(start, geometry),
            telemetry: Box::new(LogTelemetry),
        }
    }

    /// Replaces the telemetry sink.
    pub fn with_telemetry(mut self, telemetry: Box<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Folds the encoder motion since the last call into the pose estimate.
    pub fn update_pose(&mut self) -> Result<Pose, HardwareError> {
        self.tracker.update(&mut self.drivetrain)
    }

    /// The latest pose estimate.
    pub fn current_pose(&self) -> Pose {
        self.tracker.current_pose()
    }

    /// Re-seeds the pose estimate.
    pub fn reset_pose(&mut self, pose: Pose) {
        self.tracker.reset_to(pose);
    }

    /// Commands a frame of wheel powers and reports it.
    pub fn drive(&mut self, powers: WheelPowers) {
        self.drivetrain.apply(powers);
        for wheel in Wheel::ALL {
            self.telemetry
                .emit(&format!("{} power", wheel), &format!("{:.3}", powers.get(wheel)));
        }
    }

    /// Zeroes every wheel.
    pub fn stop(&mut self) {
        self.drive(WheelPowers::ZERO);
    }

    /// Yields one control tick to the drivetrain.
    pub fn idle(&mut self) {
        self.drivetrain.idle();
    }

    /// Records one telemetry value.
    pub fn emit(&mut self, key: &str, value: &str) {
        self.telemetry.emit(key, value);
    }

    /// The drivetrain.
    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    /// Mutable access to the drivetrain.
    pub fn drivetrain_mut(&mut self) -> &mut D {
        &mut self.drivetrain
    }

    /// The pose tracker.
    pub fn tracker(&self) -> &PoseTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardware::{MockDrivetrain, MockTelemetry};
    use mockall::predicate::{eq, always};

    #[test]
    fn stop_signal_is_shared_between_clones() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_raised());
        handle.raise();
        assert!(signal.is_raised());
    }

    #[test]
    fn drive_applies_and_reports_powers() {
        let mut drivetrain = MockDrivetrain::new();
        drivetrain.expect_set_wheel_power().times(4).return_const(());
        let mut telemetry = MockTelemetry::new();
        telemetry
            .expect_emit()
            .with(eq("front_left power"), always())
            .times(1)
            .return_const(());
        telemetry
            .expect_emit()
            .withf(|key, value| key != "front_left power" && value == "0.500")
            .times(3)
            .return_const(());

        let mut robot = Robot::new(drivetrain, Pose::default(), DriveGeometry::default())
            .with_telemetry(Box::new(telemetry));
        robot.drive(WheelPowers::uniform(0.5));
    }

    #[test]
    fn reset_pose_reseeds_estimate() {
        let sim = SimulatedDrivetrain::new(Pose::default(), DriveGeometry::default());
        let mut robot = Robot::new(sim, Pose::default(), DriveGeometry::default());
        let placed = Pose::from_xy(12.0, 36.0, 0.0);
        robot.reset_pose(placed);
        assert_eq!(robot.current_pose(), placed);
        assert_eq!(robot.update_pose().unwrap(), placed);
    }
}
