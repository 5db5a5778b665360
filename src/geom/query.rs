//! Stateless geometry queries used while synchronizing a scene with the engine.

use crate::error::{Error, Result};
use crate::geom::bboxes::bounding_box;
use crate::geom::point_grid::PointGrid;
use crate::{Point, Vector};

/// Returns the (min, max) corners of the points' axis-aligned bounding box.
pub fn bounds_of(points: &[Point]) -> Result<(Point, Point)> {
    bounding_box(points)
}

/// Finds the point closest to `query`, returning its index and position.
///
/// A [`PointGrid`] is built on every call. Callers issuing many queries
/// against the same points should build and keep their own grid.
pub fn nearest_point(points: &[Point], query: Point) -> Result<(usize, Point)> {
    let grid = PointGrid::with_auto_step(points);
    let idx = grid.nearest(points, query).ok_or(Error::EmptyGeometry)?;
    Ok((idx, points[idx]))
}

/// Scales `v` to unit length. A zero vector is returned unchanged.
pub fn normalize(v: Vector) -> Vector {
    let len = v.length();
    if len == 0. { v } else { v * (1. / len) }
}
