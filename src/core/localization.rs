// core/localization.rs

//! Dead-reckoning pose estimation from drivetrain encoders. Each update reads the
//! four wheel encoders, converts the tick deltas into a chassis displacement with
//! X-configuration mecanum forward kinematics, integrates that displacement onto
//! the stored pose and zeroes the encoders so the next read only sees new motion.

use log::{debug, warn};
use nalgebra::{Matrix3x4, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::geometry::{Point, Pose};
use super::hardware::{Drivetrain, HardwareError, Wheel};

/// Physical drivetrain dimensions used by the kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveGeometry {
    /// Wheel radius (inches)
    pub wheel_radius: f64,
    /// Encoder ticks per wheel revolution, after gearing
    pub ticks_per_revolution: f64,
    /// Distance between left and right wheel contact points (inches)
    pub track_width: f64,
    /// Distance between front and rear axles (inches)
    pub wheel_base: f64,
}

impl Default for DriveGeometry {
    fn default() -> Self {
        DriveGeometry {
            wheel_radius: 1.89,
            ticks_per_revolution: 537.7,
            track_width: 14.0,
            wheel_base: 12.0,
        }
    }
}

impl DriveGeometry {
    /// Linear wheel travel per encoder tick.
    pub fn inches_per_tick(&self) -> f64 {
        TAU * self.wheel_radius / self.ticks_per_revolution
    }

    /// Half of track width plus half of wheel base; the lever arm of the rollers
    /// about the chassis center for 45 degree rollers.
    pub fn turning_radius(&self) -> f64 {
        (self.track_width + self.wheel_base) / 2.0
    }
}

/// Robot-frame motion: strafe to the right, forward, and counter-clockwise turn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisDelta {
    /// Displacement toward the chassis' right side (inches)
    pub strafe: f64,
    /// Displacement toward the chassis' front (inches)
    pub forward: f64,
    /// Counter-clockwise rotation (radians)
    pub rotation: f64,
}

/// Forward kinematics of an X-configuration mecanum base.
#[derive(Debug, Clone, Copy)]
pub struct MecanumKinematics {
    geometry: DriveGeometry,
    forward: Matrix3x4<f64>,
}

impl MecanumKinematics {
    /// Builds the wheel-to-chassis matrix for `geometry`.
    pub fn new(geometry: DriveGeometry) -> Self {
        let k = 1.0 / (4.0 * geometry.turning_radius());
        // Columns are FL, FR, RL, RR. The two diagonals (FL+RR, FR+RL) carry the
        // translation; side-to-side imbalance carries the rotation.
        let forward = Matrix3x4::new(
            0.25, -0.25, -0.25, 0.25, //
            0.25, 0.25, 0.25, 0.25, //
            -k, k, -k, k,
        );
        MecanumKinematics { geometry, forward }
    }

    /// The geometry this model was built from.
    pub fn geometry(&self) -> &DriveGeometry {
        &self.geometry
    }

    /// Chassis motion produced by the given linear wheel travels (FL, FR, RL, RR).
    pub fn chassis_delta(&self, wheel_travel: [f64; 4]) -> ChassisDelta {
        let v: Vector3<f64> = self.forward * Vector4::from(wheel_travel);
        ChassisDelta {
            strafe: v[0],
            forward: v[1],
            rotation: v[2],
        }
    }

    /// Chassis motion produced by encoder tick deltas (FL, FR, RL, RR).
    pub fn chassis_delta_from_ticks(&self, ticks: [i64; 4]) -> ChassisDelta {
        let per_tick = self.geometry.inches_per_tick();
        self.chassis_delta(ticks.map(|t| t as f64 * per_tick))
    }

    /// Applies a robot-frame motion to `pose`, rotating the displacement into the
    /// field frame at the midpoint heading of the move.
    pub fn integrate(&self, pose: Pose, delta: ChassisDelta) -> Pose {
        let mid = pose.heading() + delta.rotation / 2.0;
        let (sin, cos) = mid.sin_cos();
        let dx = cos * delta.strafe - sin * delta.forward;
        let dy = sin * delta.strafe + cos * delta.forward;
        Pose::new(
            Point::new(pose.location.x + dx, pose.location.y + dy),
            pose.heading() + delta.rotation,
        )
    }
}

/// Owner of the robot's pose estimate.
///
/// Only [`PoseTracker::update`] and [`PoseTracker::reset_to`] change the
/// estimate; everything else reads it through [`PoseTracker::current_pose`].
#[derive(Debug, Clone)]
pub struct PoseTracker {
    pose: Pose,
    kinematics: MecanumKinematics,
    updates: u64,
    // Ticks already folded into `pose` on wheels whose reset failed.
    counted: [i64; 4],
}

impl PoseTracker {
    /// Starts tracking from `initial`.
    pub fn new(initial: Pose, geometry: DriveGeometry) -> Self {
        PoseTracker {
            pose: initial,
            kinematics: MecanumKinematics::new(geometry),
            updates: 0,
            counted: [0; 4],
        }
    }

    /// Reads the encoders, folds the motion into the estimate, then zeroes them.
    ///
    /// A failed read leaves the estimate untouched. A failed reset does not: the
    /// motion is already counted, and the ticks still sitting on that wheel are
    /// remembered so the next update only sees what came after them. Every
    /// wheel is reset even when an earlier one fails; the first error is returned.
    pub fn update(&mut self, drivetrain: &mut dyn Drivetrain) -> Result<Pose, HardwareError> {
        let mut raw = [0i64; 4];
        for wheel in Wheel::ALL {
            raw[wheel.index()] = drivetrain.read_encoder_ticks(wheel)?;
        }
        let mut ticks = raw;
        for (t, counted) in ticks.iter_mut().zip(self.counted) {
            *t -= counted;
        }

        let delta = self.kinematics.chassis_delta_from_ticks(ticks);
        self.pose = self.kinematics.integrate(self.pose, delta);
        self.updates += 1;

        debug!(
            "Encoder ticks {:?} -> strafe={:.3}, forward={:.3}, turn={:.4}; pose {}",
            ticks, delta.strafe, delta.forward, delta.rotation, self.pose
        );

        let mut first_error = None;
        for wheel in Wheel::ALL {
            let i = wheel.index();
            match drivetrain.reset_encoder(wheel) {
                Ok(()) => self.counted[i] = 0,
                Err(e) => {
                    warn!("{}; keeping {} counted ticks", e, raw[i]);
                    self.counted[i] = raw[i];
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(self.pose),
        }
    }

    /// The latest estimate.
    pub fn current_pose(&self) -> Pose {
        self.pose
    }

    /// Replaces the estimate, e.g. when the robot is placed at a known start.
    pub fn reset_to(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Number of encoder updates folded in so far.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    /// The kinematic model in use.
    pub fn kinematics(&self) -> &MecanumKinematics {
        &self.kinematics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hardware::MockDrivetrain;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn kinematics() -> MecanumKinematics {
        MecanumKinematics::new(DriveGeometry::default())
    }

    #[test]
    fn equal_wheel_travel_drives_forward() {
        let delta = kinematics().chassis_delta([2.0, 2.0, 2.0, 2.0]);
        assert_relative_eq!(delta.forward, 2.0);
        assert_relative_eq!(delta.strafe, 0.0);
        assert_relative_eq!(delta.rotation, 0.0);
    }

    #[test]
    fn diagonal_pattern_strafes_right() {
        let delta = kinematics().chassis_delta([1.0, -1.0, -1.0, 1.0]);
        assert_relative_eq!(delta.strafe, 1.0);
        assert_relative_eq!(delta.forward, 0.0);
        assert_relative_eq!(delta.rotation, 0.0);
    }

    #[test]
    fn opposed_sides_turn_in_place() {
        let geometry = DriveGeometry::default();
        let arc = geometry.turning_radius() * 0.5;
        let delta = kinematics().chassis_delta([-arc, arc, -arc, arc]);
        assert_relative_eq!(delta.rotation, 0.5, epsilon = 1e-12);
        assert_relative_eq!(delta.forward, 0.0);
        assert_relative_eq!(delta.strafe, 0.0);
    }

    #[test]
    fn integration_rotates_into_field_frame() {
        let k = kinematics();
        let facing_left = Pose::from_xy(10.0, 10.0, FRAC_PI_2);
        let moved = k.integrate(
            facing_left,
            ChassisDelta {
                strafe: 0.0,
                forward: 5.0,
                rotation: 0.0,
            },
        );
        assert_relative_eq!(moved.location.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(moved.location.y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn update_reads_then_resets_encoders() {
        let geometry = DriveGeometry::default();
        let ticks = (12.0 / geometry.inches_per_tick()).round() as i64;
        let mut drivetrain = MockDrivetrain::new();
        drivetrain
            .expect_read_encoder_ticks()
            .times(4)
            .returning(move |_| Ok(ticks));
        drivetrain.expect_reset_encoder().times(4).returning(|_| Ok(()));

        let mut tracker = PoseTracker::new(Pose::from_xy(20.0, 20.0, 0.0), geometry);
        let pose = tracker.update(&mut drivetrain).unwrap();
        assert_relative_eq!(pose.location.y, 32.0, epsilon = 0.05);
        assert_relative_eq!(pose.location.x, 20.0, epsilon = 1e-9);
        assert_eq!(tracker.current_pose(), pose);
        assert_eq!(tracker.update_count(), 1);
    }

    #[test]
    fn encoder_fault_leaves_estimate_untouched() {
        let mut drivetrain = MockDrivetrain::new();
        drivetrain.expect_read_encoder_ticks().returning(|wheel| {
            Err(HardwareError::EncoderRead {
                wheel,
                reason: "disconnected".into(),
            })
        });
        let start = Pose::from_xy(1.0, 2.0, 0.3);
        let mut tracker = PoseTracker::new(start, DriveGeometry::default());
        let err = tracker.update(&mut drivetrain).unwrap_err();
        assert!(matches!(err, HardwareError::EncoderRead { wheel: Wheel::FrontLeft, .. }));
        assert_eq!(tracker.current_pose(), start);
    }

    #[test]
    fn failed_reset_neither_loses_nor_repeats_motion() {
        let geometry = DriveGeometry::default();
        let ticks = (6.0 / geometry.inches_per_tick()).round() as i64;
        let per_tick = geometry.inches_per_tick();

        // First update: every wheel has moved `ticks`; the front-right reset fails.
        let mut drivetrain = MockDrivetrain::new();
        drivetrain
            .expect_read_encoder_ticks()
            .times(4)
            .returning(move |_| Ok(ticks));
        drivetrain
            .expect_reset_encoder()
            .withf(|wheel| *wheel == Wheel::FrontRight)
            .times(1)
            .returning(|wheel| {
                Err(HardwareError::EncoderReset {
                    wheel,
                    reason: "bus busy".into(),
                })
            });
        drivetrain
            .expect_reset_encoder()
            .withf(|wheel| *wheel != Wheel::FrontRight)
            .times(3)
            .returning(|_| Ok(()));

        let mut tracker = PoseTracker::new(Pose::from_xy(20.0, 20.0, 0.0), geometry);
        let err = tracker.update(&mut drivetrain).unwrap_err();
        assert!(matches!(err, HardwareError::EncoderReset { wheel: Wheel::FrontRight, .. }));
        assert_relative_eq!(tracker.current_pose().location.y, 20.0 + ticks as f64 * per_tick, epsilon = 1e-9);

        // Second update: the other wheels moved `ticks` again from zero, while the
        // front-right counter kept running from where it was.
        let mut drivetrain = MockDrivetrain::new();
        drivetrain
            .expect_read_encoder_ticks()
            .times(4)
            .returning(move |wheel| Ok(if wheel == Wheel::FrontRight { 2 * ticks } else { ticks }));
        drivetrain.expect_reset_encoder().times(4).returning(|_| Ok(()));

        let pose = tracker.update(&mut drivetrain).unwrap();
        assert_relative_eq!(pose.location.y, 20.0 + 2.0 * ticks as f64 * per_tick, epsilon = 1e-9);
        assert_relative_eq!(pose.location.x, 20.0, epsilon = 1e-9);
        assert_relative_eq!(pose.heading(), 0.0, epsilon = 1e-12);
    }
}
