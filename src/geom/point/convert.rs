//! Conversion between scene points and the engine's dense `N×3` layout.
use crate::Point;
use anyhow::{Result, ensure};
use ndarray as nd;

pub fn points_to_array(points: &[Point]) -> nd::Array2<f64> {
    nd::Array2::from_shape_fn((points.len(), 3), |(i, j)| points[i].to_array()[j])
}

/// Reads an `N×3` array back into points.
///
/// Fails if the array does not have exactly 3 columns.
pub fn array_to_points(arr: &nd::Array2<f64>) -> Result<Vec<Point>> {
    ensure!(
        arr.ncols() == 3,
        "Expected an N×3 point array, got {}×{}",
        arr.nrows(),
        arr.ncols()
    );
    Ok(arr
        .rows()
        .into_iter()
        .map(|row| Point::new(row[0], row[1], row[2]))
        .collect())
}

/// Builds an `n×3` array holding `n` copies of the same point.
pub fn replicate_point(pt: Point, n: usize) -> nd::Array2<f64> {
    let xyz = pt.to_array();
    nd::Array2::from_shape_fn((n, 3), |(_, j)| xyz[j])
}
