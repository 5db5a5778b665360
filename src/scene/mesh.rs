use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::Point;
use crate::geom::query::{bounds_of, nearest_point};

/// Cell connectivity in count-prefixed layout: `[n, i0, .., in-1, n, ...]`.
///
/// This is the scene-side convention. The engine expects one index list per
/// cell, see [`CellArray::to_cells`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellArray {
    data: Vec<usize>,
}

impl CellArray {
    /// Wraps raw count-prefixed data without validating it.
    pub fn from_raw(data: Vec<usize>) -> Self {
        Self { data }
    }

    pub fn from_cells<C: AsRef<[usize]>>(cells: &[C]) -> Self {
        let mut data = Vec::new();
        for cell in cells {
            let cell = cell.as_ref();
            data.push(cell.len());
            data.extend_from_slice(cell);
        }
        Self { data }
    }

    pub fn raw(&self) -> &[usize] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unpacks the count-prefixed data into one index list per cell.
    ///
    /// Fails if a count runs past the end of the data.
    pub fn to_cells(&self) -> Result<Vec<Vec<usize>>> {
        let mut cells = Vec::new();
        let mut idx = 0;
        while idx < self.data.len() {
            let n = self.data[idx];
            let beg = idx + 1;
            let end = beg + n;
            if end > self.data.len() {
                bail!(
                    "Truncated cell array: cell {} declares {n} points at offset {idx}, \
                     but only {} values remain",
                    cells.len(),
                    self.data.len() - beg
                );
            }
            cells.push(self.data[beg..end].to_vec());
            idx = end;
        }
        Ok(cells)
    }
}

/// A deformable body: points plus cell connectivity.
///
/// Only point positions change over time. The revision counter is bumped by
/// [`MeshBody::mark_modified`] so observers can detect updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshBody {
    points: Vec<Point>,
    cells: CellArray,
    revision: u64,
}

impl MeshBody {
    pub fn new(points: Vec<Point>, cells: CellArray) -> Self {
        Self {
            points,
            cells,
            revision: 0,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn cells(&self) -> &CellArray {
        &self.cells
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the point buffer. The point count must not change.
    pub fn set_points(&mut self, points: Vec<Point>) -> Result<()> {
        ensure!(
            points.len() == self.points.len(),
            "Point count mismatch: mesh has {} points, got {}",
            self.points.len(),
            points.len()
        );
        self.points = points;
        Ok(())
    }

    pub fn mark_modified(&mut self) {
        self.revision += 1;
    }

    /// Unpacks connectivity and checks every index against the point buffer.
    pub fn checked_cells(&self) -> Result<Vec<Vec<usize>>> {
        let cells = self.cells.to_cells()?;
        let n = self.points.len();
        for (ci, cell) in cells.iter().enumerate() {
            if let Some(&bad) = cell.iter().find(|&&i| i >= n) {
                bail!("Cell {ci} references point {bad}, but the mesh has {n} points");
            }
        }
        Ok(cells)
    }

    pub fn bounds(&self) -> crate::Result<(Point, Point)> {
        bounds_of(&self.points)
    }

    pub fn nearest_point(&self, query: Point) -> crate::Result<(usize, Point)> {
        nearest_point(&self.points, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetra() -> MeshBody {
        MeshBody::new(
            vec![
                Point::new(0., 0., 0.),
                Point::new(1., 0., 0.),
                Point::new(0., 1., 0.),
                Point::new(0., 0., 1.),
            ],
            CellArray::from_cells(&[[0, 1, 2, 3]]),
        )
    }

    #[test]
    fn test_cell_array_layout() {
        let cells = CellArray::from_cells(&[vec![0, 1, 2, 3], vec![1, 2, 3]]);
        assert_eq!(cells.raw(), &[4, 0, 1, 2, 3, 3, 1, 2, 3]);
        assert_eq!(
            cells.to_cells().unwrap(),
            vec![vec![0, 1, 2, 3], vec![1, 2, 3]]
        );
    }

    #[test]
    fn test_truncated_cell_array() {
        let cells = CellArray::from_raw(vec![4, 0, 1]);
        assert!(cells.to_cells().is_err());
    }

    #[test]
    fn test_empty_cell_array() {
        assert!(CellArray::default().to_cells().unwrap().is_empty());
    }

    #[test]
    fn test_checked_cells_out_of_range() {
        let mesh = MeshBody::new(vec![Point::origin()], CellArray::from_cells(&[[0, 5]]));
        assert!(mesh.checked_cells().is_err());
        assert_eq!(tetra().checked_cells().unwrap(), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_set_points_and_revision() {
        let mut mesh = tetra();
        let moved: Vec<Point> = mesh
            .points()
            .iter()
            .map(|p| Point::new(p.x, p.y, p.z - 1.))
            .collect();
        mesh.set_points(moved).unwrap();
        mesh.mark_modified();
        assert_eq!(mesh.revision(), 1);
        assert_eq!(mesh.points()[3], Point::new(0., 0., 0.));
        assert!(mesh.set_points(vec![Point::origin()]).is_err());
    }

    #[test]
    fn test_bounds_and_nearest() {
        let mesh = tetra();
        let (pmin, pmax) = mesh.bounds().unwrap();
        assert_eq!(pmin, Point::new(0., 0., 0.));
        assert_eq!(pmax, Point::new(1., 1., 1.));
        let (idx, _) = mesh.nearest_point(Point::new(0.9, 0.1, 0.)).unwrap();
        assert_eq!(idx, 1);
        assert!(MeshBody::default().bounds().is_err());
    }
}
