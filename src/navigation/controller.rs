// navigation/controller.rs

//! Mecanum drive control. `mecanum_powers` maps a robot-relative travel direction
//! to the four wheel ratios. Rotation and translation are tasks advanced one tick
//! at a time against the `Robot` context; `DriveController::run` is the blocking
//! loop around a task, and `DriveController::maneuver` turns joystick input into a
//! single frame of wheel powers.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::core::geometry::{angle_difference, Point};
use crate::core::hardware::{Drivetrain, WheelPowers};
use crate::core::{Robot, StopSignal};
use crate::NavError;

/// Closed-loop drive tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Peak translation power
    pub cruise_power: f64,
    /// Peak rotation power
    pub rotation_power: f64,
    /// Floor for both profiles; keeps the robot moving near the target
    pub min_power: f64,
    /// Distance over which translation ramps up and down (inches)
    pub ramp_distance: f64,
    /// Heading error below which rotation power starts tapering (radians)
    pub rotation_ramp: f64,
    /// Distance to target counted as arrived (inches)
    pub position_epsilon: f64,
    /// Heading error counted as arrived (radians)
    pub angle_epsilon: f64,
    /// Wall-clock limit for one blocking run, in seconds; none by default
    pub convergence_timeout_secs: Option<f64>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            cruise_power: 0.75,
            rotation_power: 0.75,
            min_power: 0.1,
            ramp_distance: 10.0,
            rotation_ramp: 0.5,
            position_epsilon: 0.1,
            angle_epsilon: 0.1,
            convergence_timeout_secs: None,
        }
    }
}

impl DriveConfig {
    /// The run timeout, if one is configured.
    pub fn convergence_timeout(&self) -> Option<Duration> {
        self.convergence_timeout_secs
            .map(|secs| Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// Joystick handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    /// Stick deflection treated as zero
    pub dead_zone: f64,
    /// Movement scale in coarse mode
    pub coarse_movement: f64,
    /// Movement scale in fine mode
    pub fine_movement: f64,
    /// Rotation scale in coarse mode
    pub coarse_rotation: f64,
    /// Rotation scale in fine mode
    pub fine_rotation: f64,
    /// Power used while a D-pad direction is held
    pub dpad_power: f64,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        TeleopConfig {
            dead_zone: 0.05,
            coarse_movement: 1.0,
            fine_movement: 0.25,
            coarse_rotation: 0.4,
            fine_rotation: 0.1,
            dpad_power: 1.0,
        }
    }
}

/// Result of advancing a task by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still moving toward the target
    InProgress,
    /// Within tolerance; wheels have been zeroed
    Converged,
}

/// How a blocking run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The task reached its target
    Converged,
    /// The stop signal was raised first
    Cancelled,
}

/// Wheel ratios for travelling along `direction` (robot-relative, radians,
/// 0 = toward the chassis' right, pi/2 = forward) at `magnitude` in [0, 1].
pub fn mecanum_powers(direction: f64, magnitude: f64) -> WheelPowers {
    let (sin, cos) = direction.sin_cos();
    let diagonal_a = (sin + cos).clamp(-1.0, 1.0) * magnitude;
    let diagonal_b = (sin - cos).clamp(-1.0, 1.0) * magnitude;
    WheelPowers::new(diagonal_a, diagonal_b, diagonal_b, diagonal_a)
}

/// Powers that spin the chassis in place; positive `power` turns counter-clockwise.
pub fn rotation_powers(power: f64) -> WheelPowers {
    WheelPowers::new(-power, power, -power, power)
}

/// A closed-loop motion advanced one control tick at a time.
pub trait DriveTask {
    /// Reads the robot's pose and commands one frame of wheel powers.
    fn tick<D: Drivetrain>(&mut self, robot: &mut Robot<D>) -> Progress;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Turns in place to a field heading along the shorter arc. A half-turn error
/// is resolved counter-clockwise.
#[derive(Debug, Clone)]
pub struct RotateTask {
    target: f64,
    config: DriveConfig,
}

impl RotateTask {
    /// The heading being turned to.
    pub fn target(&self) -> f64 {
        self.target
    }
}

impl DriveTask for RotateTask {
    fn tick<D: Drivetrain>(&mut self, robot: &mut Robot<D>) -> Progress {
        let error = angle_difference(self.target, robot.current_pose().heading());
        if error.abs() < self.config.angle_epsilon {
            robot.stop();
            return Progress::Converged;
        }

        let magnitude = (self.config.rotation_power * error.abs() / self.config.rotation_ramp)
            .clamp(self.config.min_power, self.config.rotation_power);
        robot.drive(rotation_powers(magnitude.copysign(error)));
        Progress::InProgress
    }

    fn describe(&self) -> String {
        format!("rotate to {:.3} rad", self.target)
    }
}

/// Drives straight to a field point without turning, re-aiming every tick.
///
/// Power rises from `min_power` to `cruise_power` over the first `ramp_distance`
/// travelled and falls back over the last `ramp_distance` remaining.
#[derive(Debug, Clone)]
pub struct TranslateTask {
    target: Point,
    origin: Option<Point>,
    config: DriveConfig,
}

impl TranslateTask {
    /// The point being driven to.
    pub fn target(&self) -> Point {
        self.target
    }

    fn profile_power(&self, travelled: f64, remaining: f64) -> f64 {
        let DriveConfig {
            min_power,
            cruise_power,
            ramp_distance,
            ..
        } = self.config;
        let ramp = |d: f64| min_power + (cruise_power - min_power) * (d / ramp_distance).min(1.0);
        ramp(travelled).min(ramp(remaining)).clamp(min_power, cruise_power)
    }
}

impl DriveTask for TranslateTask {
    fn tick<D: Drivetrain>(&mut self, robot: &mut Robot<D>) -> Progress {
        let pose = robot.current_pose();
        let origin = *self.origin.get_or_insert(pose.location);
        let remaining = pose.location.distance_to(self.target);
        if remaining < self.config.position_epsilon {
            robot.stop();
            return Progress::Converged;
        }

        let power = self.profile_power(origin.distance_to(pose.location), remaining);
        let direction = pose.location.bearing_to(self.target) - pose.heading();
        robot.drive(mecanum_powers(direction, power));
        Progress::InProgress
    }

    fn describe(&self) -> String {
        format!("translate to {}", self.target)
    }
}

/// A held D-pad direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dpad {
    /// Forward
    Up,
    /// Backward
    Down,
    /// Strafe left
    Left,
    /// Strafe right
    Right,
}

/// One sample of driver input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickInput {
    /// Left stick x, right positive
    pub left_x: f64,
    /// Left stick y, down positive (gamepad convention)
    pub left_y: f64,
    /// Right stick x; positive turns clockwise
    pub right_x: f64,
    /// Fine movement scaling
    pub fine_movement: bool,
    /// Fine rotation scaling
    pub fine_rotation: bool,
    /// Held D-pad direction, which overrides the sticks
    pub dpad: Option<Dpad>,
}

/// Converts motion requests into wheel powers.
#[derive(Debug, Clone, Default)]
pub struct DriveController {
    config: DriveConfig,
    teleop: TeleopConfig,
}

impl DriveController {
    /// Controller with the given tuning.
    pub fn new(config: DriveConfig, teleop: TeleopConfig) -> Self {
        DriveController { config, teleop }
    }

    /// The closed-loop tuning.
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Task turning to `heading`.
    pub fn rotate_to(&self, heading: f64) -> RotateTask {
        RotateTask {
            target: heading,
            config: self.config,
        }
    }

    /// Task driving to `target`.
    pub fn translate_to(&self, target: Point) -> TranslateTask {
        TranslateTask {
            target,
            origin: None,
            config: self.config,
        }
    }

    /// Drives `task` to completion.
    ///
    /// Each iteration yields to the drivetrain, refreshes the pose, checks the
    /// stop signal and the timeout, then ticks the task. Wheels are zeroed on
    /// every exit path.
    pub fn run<T: DriveTask, D: Drivetrain>(
        &self,
        task: &mut T,
        robot: &mut Robot<D>,
        stop: &StopSignal,
    ) -> Result<Completion, NavError> {
        let started = Instant::now();
        let timeout = self.config.convergence_timeout();
        debug!("Running {}", task.describe());

        loop {
            robot.idle();
            if let Err(fault) = robot.update_pose() {
                robot.stop();
                return Err(fault.into());
            }

            if stop.is_raised() {
                robot.stop();
                warn!("Cancelled {}", task.describe());
                return Ok(Completion::Cancelled);
            }

            if let Some(limit) = timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    robot.stop();
                    warn!("{} timed out after {:?}", task.describe(), elapsed);
                    return Err(NavError::ConvergenceTimeout { elapsed });
                }
            }

            if task.tick(robot) == Progress::Converged {
                info!("Completed {} at {}", task.describe(), robot.current_pose());
                return Ok(Completion::Converged);
            }
        }
    }

    /// Blocking rotation to `heading`.
    pub fn rotate<D: Drivetrain>(
        &self,
        heading: f64,
        robot: &mut Robot<D>,
        stop: &StopSignal,
    ) -> Result<Completion, NavError> {
        self.run(&mut self.rotate_to(heading), robot, stop)
    }

    /// Blocking translation to `target`.
    pub fn translate<D: Drivetrain>(
        &self,
        target: Point,
        robot: &mut Robot<D>,
        stop: &StopSignal,
    ) -> Result<Completion, NavError> {
        self.run(&mut self.translate_to(target), robot, stop)
    }

    /// One teleop frame: computes, applies and reports wheel powers for `input`.
    pub fn maneuver<D: Drivetrain>(&self, robot: &mut Robot<D>, input: &StickInput) -> WheelPowers {
        let powers = match input.dpad {
            Some(dpad) => self.dpad_powers(dpad),
            None => self.stick_powers(robot, input),
        };
        robot.drive(powers);
        robot.emit(
            "front motors",
            &format!("left ({:.2}), right ({:.2})", powers.front_left, powers.front_right),
        );
        robot.emit(
            "rear motors",
            &format!("left ({:.2}), right ({:.2})", powers.rear_left, powers.rear_right),
        );
        powers
    }

    fn stick_powers<D: Drivetrain>(&self, robot: &mut Robot<D>, input: &StickInput) -> WheelPowers {
        let t = &self.teleop;

        let mut turn = input.right_x;
        if turn.abs() < t.dead_zone {
            turn = 0.0;
        }
        turn *= if input.fine_rotation { t.fine_rotation } else { t.coarse_rotation };

        let direction = (-input.left_y).atan2(input.left_x);
        let mut power = input.left_x.hypot(input.left_y).clamp(0.0, 1.0);
        if power <= t.dead_zone {
            power = 0.0;
        }
        power *= if input.fine_movement { t.fine_movement } else { t.coarse_movement };

        robot.emit("left stick direction", &format!("{:.1} degrees", direction.to_degrees()));

        let ratios = mecanum_powers(direction, power);
        WheelPowers::new(
            ratios.front_left + turn,
            ratios.front_right - turn,
            ratios.rear_left + turn,
            ratios.rear_right - turn,
        )
    }

    fn dpad_powers(&self, dpad: Dpad) -> WheelPowers {
        let p = self.teleop.dpad_power;
        match dpad {
            Dpad::Up => WheelPowers::uniform(p),
            Dpad::Down => WheelPowers::uniform(-p),
            Dpad::Right => WheelPowers::new(p, -p, -p, p),
            Dpad::Left => WheelPowers::new(-p, p, p, -p),
        }
    }
}
