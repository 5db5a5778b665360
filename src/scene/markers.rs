use serde::{Deserialize, Serialize};

use crate::geom::bboxes::{bbox_center, bbox_half_extents};
use crate::{Point, Vector};

/// Axis-aligned region of interest given by a center and half extents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMarker {
    pub center: Point,
    pub half_extents: [f64; 3],
}

impl RegionMarker {
    pub fn new(center: Point, half_extents: [f64; 3]) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Region spanning the box `[pmin, pmax]`.
    pub fn from_corners(pmin: Point, pmax: Point) -> Self {
        Self::new(bbox_center(pmin, pmax), bbox_half_extents(pmin, pmax))
    }

    /// Returns the (min, max) corners.
    ///
    /// Negative half extents are accepted and yield the same box as their
    /// absolute values.
    pub fn corners(&self) -> (Point, Point) {
        let c = self.center.to_array();
        let mut lo = [0.; 3];
        let mut hi = [0.; 3];
        for axis in 0..3 {
            let a = c[axis] - self.half_extents[axis];
            let b = c[axis] + self.half_extents[axis];
            lo[axis] = a.min(b);
            hi[axis] = a.max(b);
        }
        (Point::from_array(lo), Point::from_array(hi))
    }
}

/// A line drawn by the user. The first two control points are its endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineMarker {
    control_points: Vec<Point>,
}

impl LineMarker {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            control_points: vec![start, end],
        }
    }

    /// A line without control points, e.g. one the user has not placed yet.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_control_point(&mut self, pt: Point) {
        self.control_points.push(pt);
    }

    pub fn control_points(&self) -> &[Point] {
        &self.control_points
    }

    /// Returns `None` while fewer than two points are placed.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        match self.control_points.as_slice() {
            [start, end, ..] => Some((*start, *end)),
            _ => None,
        }
    }

    /// Vector from the first to the second endpoint.
    pub fn vector(&self) -> Option<Vector> {
        self.endpoints()
            .map(|(start, end)| Vector::from_points(start, end))
    }
}

/// A tracked point (fiducial). The first control point is its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointMarker {
    control_points: Vec<Point>,
}

impl PointMarker {
    pub fn new(position: Point) -> Self {
        Self {
            control_points: vec![position],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<Point> {
        self.control_points.first().copied()
    }

    /// Moves the marker, placing it if it has no position yet.
    pub fn set_position(&mut self, pt: Point) {
        match self.control_points.first_mut() {
            Some(first) => *first = pt,
            None => self.control_points.push(pt),
        }
    }
}
