//! Bounds-driven construction of markers around a mesh.

use crate::Point;
use crate::error::Result;
use crate::geom::bboxes::bbox_center;

use super::{LineMarker, MeshBody, PointMarker, RegionMarker};

/// Region covering the whole mesh.
pub fn region_covering(mesh: &MeshBody) -> Result<RegionMarker> {
    let (pmin, pmax) = mesh.bounds()?;
    Ok(RegionMarker::from_corners(pmin, pmax))
}

/// Region anchored at the bottom (min z) of the mesh.
///
/// The half extents are half the mesh extent in x and y and
/// `fraction * extent` in z; the center sits at `zmin + half_z / 2`.
pub fn lower_slab_region(mesh: &MeshBody, fraction: f64) -> Result<RegionMarker> {
    let (pmin, pmax) = mesh.bounds()?;
    let half = [
        (pmax.x - pmin.x) * 0.5,
        (pmax.y - pmin.y) * 0.5,
        (pmax.z - pmin.z) * fraction,
    ];
    let c = bbox_center(pmin, pmax);
    let center = Point::new(c.x, c.y, pmin.z + half[2] / 2.);
    Ok(RegionMarker::new(center, half))
}

/// Line through the mesh center running from min y to max y.
pub fn vertical_gravity_line(mesh: &MeshBody) -> Result<LineMarker> {
    let (pmin, pmax) = mesh.bounds()?;
    let c = bbox_center(pmin, pmax);
    Ok(LineMarker::new(
        Point::new(c.x, pmin.y, c.z),
        Point::new(c.x, pmax.y, c.z),
    ))
}

/// Point marker placed on the mesh point closest to `viewpoint` (e.g. a camera).
pub fn point_marker_nearest(mesh: &MeshBody, viewpoint: Point) -> Result<PointMarker> {
    let (_, closest) = mesh.nearest_point(viewpoint)?;
    Ok(PointMarker::new(closest))
}

/// Positions `start + i * (end - start) / steps` for `i` in `0..steps`.
pub fn linear_path(start: Point, end: Point, steps: usize) -> Vec<Point> {
    if steps == 0 {
        return Vec::new();
    }
    (0..steps)
        .map(|i| Point::new_between_2_points(start, end, i as f64 / steps as f64))
        .collect()
}
