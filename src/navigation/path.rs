// navigation/path.rs

//! Ordered waypoint sequences. The front of a `Path` is the next target; a
//! waypoint may carry a label, and labels starting with "POI" mark stops where
//! autonomous travel pauses for a non-navigation action.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::core::geometry::{Point, Pose};

/// Prefix that marks a label as a point of interest.
pub const POI_PREFIX: &str = "POI";

/// A target pose with an optional identifying label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    /// Where to go and which way to face
    pub pose: Pose,
    /// Identifying label, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Waypoint {
    /// Unlabelled waypoint.
    pub fn new(pose: Pose) -> Self {
        Waypoint { pose, label: None }
    }

    /// Waypoint carrying `label`.
    pub fn labelled(pose: Pose, label: impl Into<String>) -> Self {
        Waypoint {
            pose,
            label: Some(label.into()),
        }
    }

    /// Location of the waypoint.
    pub fn location(&self) -> Point {
        self.pose.location
    }

    /// True if the label marks a point of interest.
    pub fn is_poi(&self) -> bool {
        self.label
            .as_deref()
            .is_some_and(|label| label.starts_with(POI_PREFIX))
    }
}

impl From<Pose> for Waypoint {
    fn from(pose: Pose) -> Self {
        Waypoint::new(pose)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} [{}]", self.pose, label),
            None => write!(f, "{}", self.pose),
        }
    }
}

/// Ordered sequence of waypoints; the front is the next unvisited target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    waypoints: VecDeque<Waypoint>,
}

impl Path {
    /// Empty path.
    pub fn new() -> Self {
        Path::default()
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// True if no waypoints remain.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// The next target.
    pub fn front(&self) -> Option<&Waypoint> {
        self.waypoints.front()
    }

    /// The final target.
    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.back()
    }

    /// Waypoint at `index`.
    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    /// Removes and returns the next target.
    pub fn pop_front(&mut self) -> Option<Waypoint> {
        self.waypoints.pop_front()
    }

    /// Appends a waypoint at the end.
    pub fn push(&mut self, waypoint: impl Into<Waypoint>) {
        self.waypoints.push_back(waypoint.into());
    }

    /// Inserts a waypoint before `index`; indices past the end append.
    pub fn insert(&mut self, index: usize, waypoint: impl Into<Waypoint>) {
        let index = index.min(self.waypoints.len());
        self.waypoints.insert(index, waypoint.into());
    }

    /// Appends every waypoint of `other`.
    pub fn extend(&mut self, other: Path) {
        self.waypoints.extend(other.waypoints);
    }

    /// Drops every waypoint.
    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    /// Waypoints front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Waypoint locations front to back.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.waypoints.iter().map(Waypoint::location)
    }

    /// Total length of the polyline through all waypoints.
    pub fn length(&self) -> f64 {
        polyline_length(self.points())
    }

    /// Length travelled from `from` through every waypoint.
    pub fn length_from(&self, from: Point) -> f64 {
        polyline_length(std::iter::once(from).chain(self.points()))
    }

    /// Label of the first point of interest still ahead.
    pub fn next_poi(&self) -> Option<&str> {
        self.waypoints
            .iter()
            .find(|w| w.is_poi())
            .and_then(|w| w.label.as_deref())
    }

    /// Applies `f` to every waypoint pose.
    pub fn map_poses(&self, f: impl Fn(Pose) -> Pose) -> Path {
        self.waypoints
            .iter()
            .map(|w| Waypoint {
                pose: f(w.pose),
                label: w.label.clone(),
            })
            .collect()
    }
}

impl FromIterator<Waypoint> for Path {
    fn from_iter<I: IntoIterator<Item = Waypoint>>(iter: I) -> Self {
        Path {
            waypoints: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Pose> for Path {
    fn from_iter<I: IntoIterator<Item = Pose>>(iter: I) -> Self {
        iter.into_iter().map(Waypoint::new).collect()
    }
}

impl IntoIterator for Path {
    type Item = Waypoint;
    type IntoIter = std::collections::vec_deque::IntoIter<Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Waypoint;
    type IntoIter = std::collections::vec_deque::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

/// Sum of segment lengths through `points`.
pub fn polyline_length(points: impl IntoIterator<Item = Point>) -> f64 {
    let mut points = points.into_iter();
    let Some(mut previous) = points.next() else {
        return 0.0;
    };
    let mut total = 0.0;
    for p in points {
        total += previous.distance_to(p);
        previous = p;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Some("POI carousel"), true)]
    #[case(Some("POI"), true)]
    #[case(Some("doorway"), false)]
    #[case(Some("poi lowercase"), false)]
    #[case(None, false)]
    fn poi_detection(#[case] label: Option<&str>, #[case] expected: bool) {
        let waypoint = Waypoint {
            pose: Pose::default(),
            label: label.map(str::to_string),
        };
        assert_eq!(waypoint.is_poi(), expected);
    }

    #[test]
    fn path_is_a_front_first_queue() {
        let mut path: Path = [Pose::from_xy(0.0, 0.0, 0.0), Pose::from_xy(3.0, 4.0, 0.0)]
            .into_iter()
            .collect();
        path.insert(1, Waypoint::labelled(Pose::from_xy(0.0, 4.0, 0.0), "POI mid"));
        path.insert(99, Pose::from_xy(3.0, 8.0, 0.0));
        assert_eq!(path.len(), 4);
        assert_relative_eq!(path.length(), 4.0 + 3.0 + 4.0);
        assert_eq!(path.next_poi(), Some("POI mid"));

        let first = path.pop_front().unwrap();
        assert_eq!(first.location(), Point::new(0.0, 0.0));
        assert_eq!(path.front().unwrap().label.as_deref(), Some("POI mid"));
        assert_eq!(path.last().unwrap().location(), Point::new(3.0, 8.0));
    }

    #[test]
    fn empty_polyline_has_zero_length() {
        assert_eq!(polyline_length(Vec::new()), 0.0);
        assert_eq!(polyline_length(vec![Point::new(1.0, 1.0)]), 0.0);
    }
}
