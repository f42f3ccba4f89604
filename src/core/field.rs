// core/field.rs

//! Fixed exclusion zones of the competition field: three circular hubs and three
//! rectangular barriers. The layout is mirror-symmetric about x = 72, which is
//! what lets autonomous routines be reflected between alliances.

use super::geometry::{Point, Pose};

/// Width (and height) of the square field, in inches.
pub const FIELD_SIZE: f64 = 144.0;

/// The x coordinate of the line separating the two alliance halves.
pub const FIELD_CENTER_X: f64 = FIELD_SIZE / 2.0;

/// Exclusion radius around each hub center.
pub const HUB_EXCLUSION_RADIUS: f64 = 11.0;

/// Hub centers: the shared hub, then the two alliance hubs.
pub const HUB_CENTERS: [Point; 3] = [
    Point::new(72.0, 120.0),
    Point::new(48.0, 60.0),
    Point::new(96.0, 60.0),
];

/// Shape of an exclusion zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Obstacle {
    /// Disc of `radius` around `center`, boundary included
    Circle {
        /// Center of the disc
        center: Point,
        /// Radius of the disc
        radius: f64,
    },
    /// Axis-aligned rectangle spanning `min` to `min + (width, height)`, boundary included
    Rectangle {
        /// Lower-left corner
        min: Point,
        /// Extent along x
        width: f64,
        /// Extent along y
        height: f64,
    },
}

impl Obstacle {
    /// True if `p` lies inside or on the boundary of the zone.
    pub fn contains(&self, p: Point) -> bool {
        match *self {
            Obstacle::Circle { center, radius } => center.distance_to(p) <= radius,
            Obstacle::Rectangle { min, width, height } => {
                p.x >= min.x && p.x <= min.x + width && p.y >= min.y && p.y <= min.y + height
            }
        }
    }
}

/// The three barriers, each with its own detour doorways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    /// Long barrier spanning most of the field width
    Horizontal,
    /// Short barrier rising from the left part of the horizontal one
    VerticalLeft,
    /// Short barrier rising from the right part of the horizontal one
    VerticalRight,
}

impl Barrier {
    /// All barriers, in the order the planner tests them.
    pub const ALL: [Barrier; 3] = [Barrier::Horizontal, Barrier::VerticalLeft, Barrier::VerticalRight];

    /// The rectangle occupied by this barrier.
    pub const fn shape(self) -> Obstacle {
        match self {
            Barrier::Horizontal => Obstacle::Rectangle {
                min: Point::new(13.68, 99.5 - 5.77),
                width: 116.32,
                height: 5.77,
            },
            Barrier::VerticalLeft => Obstacle::Rectangle {
                min: Point::new(44.6, 130.2 - 30.75),
                width: 5.77,
                height: 30.75,
            },
            Barrier::VerticalRight => Obstacle::Rectangle {
                min: Point::new(93.75, 130.2 - 30.75),
                width: 5.77,
                height: 30.75,
            },
        }
    }
}

/// Doorway points used to route around the barriers.
pub mod doorways {
    use super::Point;

    /// Below the horizontal barrier, left gap
    pub const H_LEFT_LOW: Point = Point::new(6.0, 92.0);
    /// Above the horizontal barrier, left gap
    pub const H_LEFT_HIGH: Point = Point::new(6.0, 104.0);
    /// Below the horizontal barrier, right gap
    pub const H_RIGHT_LOW: Point = Point::new(137.0, 92.0);
    /// Above the horizontal barrier, right gap
    pub const H_RIGHT_HIGH: Point = Point::new(137.0, 104.0);
    /// Over the top of the left vertical barrier, west side
    pub const VL_WEST: Point = Point::new(42.0, 137.0);
    /// Over the top of the left vertical barrier, east side
    pub const VL_EAST: Point = Point::new(54.0, 137.0);
    /// Over the top of the right vertical barrier, west side
    pub const VR_WEST: Point = Point::new(91.0, 137.0);
    /// Over the top of the right vertical barrier, east side
    pub const VR_EAST: Point = Point::new(101.0, 137.0);
}

/// Point-containment queries against the fixed field layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObstacleMap;

impl ObstacleMap {
    /// The field's obstacle map.
    pub fn new() -> Self {
        ObstacleMap
    }

    /// True iff `p` lies within any hub or barrier.
    pub fn contains(&self, p: Point) -> bool {
        self.in_hub(p) || self.barrier_at(p).is_some()
    }

    /// True iff `p` is within the exclusion radius of any hub.
    pub fn in_hub(&self, p: Point) -> bool {
        HUB_CENTERS
            .iter()
            .any(|center| center.distance_to(p) <= HUB_EXCLUSION_RADIUS)
    }

    /// The first barrier containing `p`, horizontal before vertical.
    pub fn barrier_at(&self, p: Point) -> Option<Barrier> {
        Barrier::ALL.into_iter().find(|barrier| barrier.shape().contains(p))
    }

    /// Every exclusion zone on the field.
    pub fn obstacles(&self) -> Vec<Obstacle> {
        HUB_CENTERS
            .iter()
            .map(|&center| Obstacle::Circle {
                center,
                radius: HUB_EXCLUSION_RADIUS,
            })
            .chain(Barrier::ALL.iter().map(|barrier| barrier.shape()))
            .collect()
    }

    /// True if no sample along the straight segment `a`-`b` falls in an obstacle.
    pub fn segment_is_clear(&self, a: Point, b: Point, spacing: f64) -> bool {
        let length = a.distance_to(b);
        let samples = (length / spacing).ceil().max(1.0) as usize;
        (0..=samples).all(|i| {
            let t = i as f64 / samples as f64;
            let p = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
            !self.contains(p)
        })
    }
}

/// Reflects a point across the field centerline.
pub fn mirror_point(p: Point) -> Point {
    Point::new(FIELD_SIZE - p.x, p.y)
}

/// Reflects a pose across the field centerline. Reflection reverses the sense of
/// rotation, so the heading is negated.
pub fn mirror_pose(pose: Pose) -> Pose {
    Pose::new(mirror_point(pose.location), -pose.heading())
}
