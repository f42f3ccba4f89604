// core/geometry.rs

//! Value types for field coordinates. Distances are in inches with the origin at
//! the field corner; angles are radians, counter-clockwise positive.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// Wraps an angle into the interval (-pi, pi].
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Signed shortest rotation taking `from` onto `to`, in (-pi, pi].
pub fn angle_difference(to: f64, from: f64) -> f64 {
    normalize_angle(to - from)
}

/// A location on the field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (inches)
    pub x: f64,
    /// Y coordinate (inches)
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle between the +x axis and the segment from this point to `other`.
    pub fn bearing_to(&self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// The point `distance` away along `bearing`.
    pub fn step_toward(&self, bearing: f64, distance: f64) -> Point {
        Point {
            x: self.x + bearing.cos() * distance,
            y: self.y + bearing.sin() * distance,
        }
    }

    /// True when the two points are closer than `tolerance`.
    pub fn approx_eq(&self, other: Point, tolerance: f64) -> bool {
        self.distance_to(other) < tolerance
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// A location plus chassis heading.
///
/// Heading 0 means the chassis' right side faces +x and its front faces +y.
/// The heading is always kept in (-pi, pi]; every transformation returns a new
/// pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawPose")]
pub struct Pose {
    /// Position on the field
    pub location: Point,
    heading: f64,
}

#[derive(Deserialize)]
struct RawPose {
    location: Point,
    heading: f64,
}

impl From<RawPose> for Pose {
    fn from(raw: RawPose) -> Self {
        Pose::new(raw.location, raw.heading)
    }
}

impl Pose {
    /// Creates a pose, normalising the heading.
    pub fn new(location: Point, heading: f64) -> Self {
        Pose {
            location,
            heading: normalize_angle(heading),
        }
    }

    /// Shorthand for `Pose::new(Point::new(x, y), heading)`.
    pub fn from_xy(x: f64, y: f64, heading: f64) -> Self {
        Pose::new(Point::new(x, y), heading)
    }

    /// Heading in (-pi, pi].
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// This pose turned by `delta` radians.
    pub fn rotated(&self, delta: f64) -> Pose {
        Pose::new(self.location, self.heading + delta)
    }

    /// This pose with its heading replaced.
    pub fn with_heading(&self, heading: f64) -> Pose {
        Pose::new(self.location, heading)
    }

    /// This pose moved to `location`, keeping the heading.
    pub fn with_location(&self, location: Point) -> Pose {
        Pose {
            location,
            heading: self.heading,
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} @ {:.3} rad", self.location, self.heading)
    }
}
