pub mod bboxes;
pub mod point;
pub mod point_grid;
pub mod query;
pub mod vector;

/// Geometric precision
const EPS: f64 = 1e-13;
