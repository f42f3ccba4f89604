// core/simulation.rs

//! In-process mecanum chassis used by the binary and the closed-loop tests. Wheel
//! powers become wheel surface speeds, which are pushed through the same forward
//! kinematics as the pose tracker to move a ground-truth pose. Encoders accumulate
//! fractional ticks so that rounding never drifts the odometry.

use log::trace;

use super::geometry::Pose;
use super::hardware::{Drivetrain, HardwareError, Wheel};
use super::localization::{DriveGeometry, MecanumKinematics};

/// Wheel surface speed at full power (inches per second).
pub const DEFAULT_MAX_WHEEL_SPEED: f64 = 40.0;

/// Simulated time advanced by each `idle` call (seconds).
pub const DEFAULT_TIME_STEP: f64 = 0.02;

/// A perfect-traction mecanum chassis driven by wheel powers.
#[derive(Debug, Clone)]
pub struct SimulatedDrivetrain {
    kinematics: MecanumKinematics,
    pose: Pose,
    powers: [f64; 4],
    encoders: [f64; 4],
    faulty: [bool; 4],
    max_wheel_speed: f64,
    time_step: f64,
    steps: u64,
}

impl SimulatedDrivetrain {
    /// Chassis resting at `start`.
    pub fn new(start: Pose, geometry: DriveGeometry) -> Self {
        SimulatedDrivetrain {
            kinematics: MecanumKinematics::new(geometry),
            pose: start,
            powers: [0.0; 4],
            encoders: [0.0; 4],
            faulty: [false; 4],
            max_wheel_speed: DEFAULT_MAX_WHEEL_SPEED,
            time_step: DEFAULT_TIME_STEP,
            steps: 0,
        }
    }

    /// Overrides the full-power wheel speed.
    pub fn with_max_wheel_speed(mut self, speed: f64) -> Self {
        self.max_wheel_speed = speed;
        self
    }

    /// Overrides the time advanced per `idle` call.
    pub fn with_time_step(mut self, dt: f64) -> Self {
        self.time_step = dt;
        self
    }

    /// Where the chassis actually is.
    pub fn true_pose(&self) -> Pose {
        self.pose
    }

    /// Power last commanded to `wheel`.
    pub fn wheel_power(&self, wheel: Wheel) -> f64 {
        self.powers[wheel.index()]
    }

    /// Simulated seconds elapsed.
    pub fn elapsed(&self) -> f64 {
        self.steps as f64 * self.time_step
    }

    /// Number of `idle` calls so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Makes every subsequent read of `wheel`'s encoder fail.
    pub fn inject_encoder_fault(&mut self, wheel: Wheel) {
        self.faulty[wheel.index()] = true;
    }

    /// Removes all injected faults.
    pub fn clear_faults(&mut self) {
        self.faulty = [false; 4];
    }

    /// Advances the chassis by one time step under the current powers.
    pub fn step(&mut self) {
        let travel = self.powers.map(|p| p * self.max_wheel_speed * self.time_step);
        let per_tick = self.kinematics.geometry().inches_per_tick();
        for (count, distance) in self.encoders.iter_mut().zip(travel) {
            *count += distance / per_tick;
        }
        let delta = self.kinematics.chassis_delta(travel);
        self.pose = self.kinematics.integrate(self.pose, delta);
        self.steps += 1;
        trace!("sim step {}: {}", self.steps, self.pose);
    }
}

impl Drivetrain for SimulatedDrivetrain {
    fn set_wheel_power(&mut self, wheel: Wheel, power: f64) {
        self.powers[wheel.index()] = power.clamp(-1.0, 1.0);
    }

    fn read_encoder_ticks(&mut self, wheel: Wheel) -> Result<i64, HardwareError> {
        if self.faulty[wheel.index()] {
            return Err(HardwareError::EncoderRead {
                wheel,
                reason: "injected fault".to_string(),
            });
        }
        Ok(self.encoders[wheel.index()].round() as i64)
    }

    fn reset_encoder(&mut self, wheel: Wheel) -> Result<(), HardwareError> {
        // Keep the sub-tick remainder so repeated read/reset cycles do not drift.
        let count = &mut self.encoders[wheel.index()];
        *count -= count.round();
        Ok(())
    }

    fn idle(&mut self) {
        self.step();
    }
}
