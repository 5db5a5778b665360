use crate::Point;
use crate::error::{Error, Result};

/// Returns the (min, max) corners of the axis-aligned box holding all points `pts`.
pub fn bounding_box(pts: &[Point]) -> Result<(Point, Point)> {
    let first = pts.first().ok_or(Error::EmptyGeometry)?;
    let init = (*first, *first);
    Ok(pts.iter().skip(1).fold(init, |(pmin, pmax), p| {
        (
            Point::new(pmin.x.min(p.x), pmin.y.min(p.y), pmin.z.min(p.z)),
            Point::new(pmax.x.max(p.x), pmax.y.max(p.y), pmax.z.max(p.z)),
        )
    }))
}

/// Checks whether a point lies inside the box `[pmin, pmax]` (boundary included).
pub fn is_point_inside_bbox(ptest: Point, pmin: Point, pmax: Point) -> bool {
    ptest.x >= pmin.x
        && ptest.x <= pmax.x
        && ptest.y >= pmin.y
        && ptest.y <= pmax.y
        && ptest.z >= pmin.z
        && ptest.z <= pmax.z
}

/// Center of the box.
pub fn bbox_center(pmin: Point, pmax: Point) -> Point {
    Point::new_between_2_points(pmin, pmax, 0.5)
}

/// Half extents of the box along each axis (always non-negative).
pub fn bbox_half_extents(pmin: Point, pmax: Point) -> [f64; 3] {
    [
        (pmax.x - pmin.x).abs() / 2.,
        (pmax.y - pmin.y).abs() / 2.,
        (pmax.z - pmin.z).abs() / 2.,
    ]
}

/// Flattens a box into the engine's `[minX, minY, minZ, maxX, maxY, maxZ]` layout.
pub fn bbox_to_flat(pmin: Point, pmax: Point) -> [f64; 6] {
    [pmin.x, pmin.y, pmin.z, pmax.x, pmax.y, pmax.z]
}

/// Inverse of [`bbox_to_flat`].
pub fn bbox_from_flat(b: [f64; 6]) -> (Point, Point) {
    (Point::new(b[0], b[1], b[2]), Point::new(b[3], b[4], b[5]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let pts = vec![
            Point::new(1., -2., 0.),
            Point::new(-1., 3., 4.),
            Point::new(0., 0., -5.),
        ];
        let (pmin, pmax) = bounding_box(&pts).unwrap();
        assert_eq!(pmin, Point::new(-1., -2., -5.));
        assert_eq!(pmax, Point::new(1., 3., 4.));
    }

    #[test]
    fn test_bounding_box_single_point() {
        let p = Point::new(1., 2., 3.);
        assert_eq!(bounding_box(&[p]).unwrap(), (p, p));
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(matches!(bounding_box(&[]), Err(Error::EmptyGeometry)));
    }

    #[test]
    fn test_inside() {
        let pmin = Point::new(0., 0., 0.);
        let pmax = Point::new(1., 1., 1.);
        assert!(is_point_inside_bbox(Point::new(0.5, 0.5, 0.5), pmin, pmax));
        assert!(is_point_inside_bbox(pmax, pmin, pmax));
        assert!(!is_point_inside_bbox(Point::new(1.5, 0.5, 0.5), pmin, pmax));
    }

    #[test]
    fn test_center_extents_and_flat() {
        let pmin = Point::new(-1., 0., 2.);
        let pmax = Point::new(1., 4., 3.);
        assert_eq!(bbox_center(pmin, pmax), Point::new(0., 2., 2.5));
        assert_eq!(bbox_half_extents(pmin, pmax), [1., 2., 0.5]);
        let flat = bbox_to_flat(pmin, pmax);
        assert_eq!(flat, [-1., 0., 2., 1., 4., 3.]);
        assert_eq!(bbox_from_flat(flat), (pmin, pmax));
    }
}
