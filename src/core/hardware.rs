// core/hardware.rs

//! Boundary to the robot hardware. The drivetrain exposes four motor power
//! setters and their encoders; telemetry is a best-effort key/value sink. Both
//! are implemented outside this crate on a real robot and by the simulator or
//! mocks here.

use std::fmt;

/// One of the four mecanum wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    /// Front left
    FrontLeft,
    /// Front right
    FrontRight,
    /// Rear left
    RearLeft,
    /// Rear right
    RearRight,
}

impl Wheel {
    /// All wheels in FL, FR, RL, RR order.
    pub const ALL: [Wheel; 4] = [Wheel::FrontLeft, Wheel::FrontRight, Wheel::RearLeft, Wheel::RearRight];

    /// Position of this wheel in [`Wheel::ALL`].
    pub fn index(self) -> usize {
        match self {
            Wheel::FrontLeft => 0,
            Wheel::FrontRight => 1,
            Wheel::RearLeft => 2,
            Wheel::RearRight => 3,
        }
    }
}

impl fmt::Display for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Wheel::FrontLeft => "front_left",
            Wheel::FrontRight => "front_right",
            Wheel::RearLeft => "rear_left",
            Wheel::RearRight => "rear_right",
        };
        f.write_str(name)
    }
}

/// One frame of drivetrain output. Every field is kept in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPowers {
    /// Front left power
    pub front_left: f64,
    /// Front right power
    pub front_right: f64,
    /// Rear left power
    pub rear_left: f64,
    /// Rear right power
    pub rear_right: f64,
}

impl WheelPowers {
    /// All wheels stopped.
    pub const ZERO: WheelPowers = WheelPowers {
        front_left: 0.0,
        front_right: 0.0,
        rear_left: 0.0,
        rear_right: 0.0,
    };

    /// Builds a frame, clipping each power into [-1, 1].
    pub fn new(front_left: f64, front_right: f64, rear_left: f64, rear_right: f64) -> Self {
        WheelPowers {
            front_left: front_left.clamp(-1.0, 1.0),
            front_right: front_right.clamp(-1.0, 1.0),
            rear_left: rear_left.clamp(-1.0, 1.0),
            rear_right: rear_right.clamp(-1.0, 1.0),
        }
    }

    /// Same power on every wheel.
    pub fn uniform(power: f64) -> Self {
        WheelPowers::new(power, power, power, power)
    }

    /// Every power multiplied by `factor`, then clipped.
    pub fn scaled(&self, factor: f64) -> Self {
        WheelPowers::new(
            self.front_left * factor,
            self.front_right * factor,
            self.rear_left * factor,
            self.rear_right * factor,
        )
    }

    /// Power for one wheel.
    pub fn get(&self, wheel: Wheel) -> f64 {
        match wheel {
            Wheel::FrontLeft => self.front_left,
            Wheel::FrontRight => self.front_right,
            Wheel::RearLeft => self.rear_left,
            Wheel::RearRight => self.rear_right,
        }
    }

    /// Powers in FL, FR, RL, RR order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.front_left, self.front_right, self.rear_left, self.rear_right]
    }
}

/// Failures reported by the hardware collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HardwareError {
    /// An encoder could not be read
    #[error("encoder read failed on {wheel}: {reason}")]
    EncoderRead {
        /// Wheel whose encoder failed
        wheel: Wheel,
        /// Driver-supplied description
        reason: String,
    },
    /// An encoder could not be zeroed
    #[error("encoder reset failed on {wheel}: {reason}")]
    EncoderReset {
        /// Wheel whose encoder failed
        wheel: Wheel,
        /// Driver-supplied description
        reason: String,
    },
}

/// Motor and encoder access for a four-wheel mecanum drivetrain.
///
/// Encoders count ticks with forward wheel rotation positive; right-side
/// motors are expected to be direction-reversed by the implementation.
#[cfg_attr(test, mockall::automock)]
pub trait Drivetrain {
    /// Sets one wheel's power in [-1, 1]. Fire-and-forget.
    fn set_wheel_power(&mut self, wheel: Wheel, power: f64);

    /// Ticks counted since the last reset.
    fn read_encoder_ticks(&mut self, wheel: Wheel) -> Result<i64, HardwareError>;

    /// Zeroes one encoder.
    fn reset_encoder(&mut self, wheel: Wheel) -> Result<(), HardwareError>;

    /// Called once per control tick before sensors are read. Real hardware
    /// uses it to yield to the event loop; simulators advance time.
    fn idle(&mut self) {}
}

/// Frame-level helpers available on every [`Drivetrain`].
pub trait DrivetrainExt: Drivetrain {
    /// Applies a full frame of wheel powers.
    fn apply(&mut self, powers: WheelPowers) {
        for wheel in Wheel::ALL {
            self.set_wheel_power(wheel, powers.get(wheel));
        }
    }

    /// Zeroes every wheel.
    fn stop(&mut self) {
        self.apply(WheelPowers::ZERO);
    }
}

impl<T: Drivetrain + ?Sized> DrivetrainExt for T {}

/// Best-effort key/value telemetry sink.
#[cfg_attr(test, mockall::automock)]
pub trait Telemetry {
    /// Records one value under `key`. Must not block.
    fn emit(&mut self, key: &str, value: &str);
}

/// Telemetry sink that forwards to the `log` facade under the `telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn emit(&mut self, key: &str, value: &str) {
        log::debug!(target: "telemetry", "{}: {}", key, value);
    }
}

/// Telemetry sink that keeps the latest value per key; useful for dashboards and tests.
#[derive(Debug, Default, Clone)]
pub struct TelemetryBuffer {
    entries: Vec<(String, String)>,
}

impl TelemetryBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        TelemetryBuffer::default()
    }

    /// Latest value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of distinct keys recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Telemetry for TelemetryBuffer {
    fn emit(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }
}
