use std::collections::HashMap;

use crate::Point;
use crate::geom::bboxes::bounding_box;

type Cell = (i64, i64, i64);

/// Uniform voxel hash over a point cloud, used for nearest-point lookups.
///
/// Stores point indices only; the points themselves are passed again to
/// [`PointGrid::nearest`] so the grid never outlives the caller's buffer.
pub struct PointGrid {
    grid: HashMap<Cell, Vec<usize>>,
    step: f64,
    cell_min: Cell,
    cell_max: Cell,
}

impl PointGrid {
    pub fn new(points: &[Point], step: f64) -> Self {
        let step = if step.is_finite() && step > 0. { step } else { 1. };
        let mut grid: HashMap<Cell, Vec<usize>> = HashMap::new();
        let mut cell_min = (i64::MAX, i64::MAX, i64::MAX);
        let mut cell_max = (i64::MIN, i64::MIN, i64::MIN);

        for (idx, p) in points.iter().enumerate() {
            let c = cell_of(*p, step);
            cell_min = (cell_min.0.min(c.0), cell_min.1.min(c.1), cell_min.2.min(c.2));
            cell_max = (cell_max.0.max(c.0), cell_max.1.max(c.1), cell_max.2.max(c.2));
            // Indices are pushed in increasing order, which the tie-break relies on.
            grid.entry(c).or_default().push(idx);
        }

        Self {
            grid,
            step,
            cell_min,
            cell_max,
        }
    }

    /// Builds a grid whose cell size gives roughly one point per cell.
    pub fn with_auto_step(points: &[Point]) -> Self {
        let step = match bounding_box(points) {
            Ok((pmin, pmax)) => {
                let extent = (pmax.x - pmin.x).max(pmax.y - pmin.y).max(pmax.z - pmin.z);
                extent / (points.len() as f64).cbrt()
            }
            Err(_) => 1.,
        };
        Self::new(points, step)
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Returns the index of the point closest to `query`.
    ///
    /// Cells are visited in rings of growing Chebyshev radius around the
    /// query cell. Exact distance ties resolve to the lowest index.
    /// `points` must be the slice the grid was built from.
    pub fn nearest(&self, points: &[Point], query: Point) -> Option<usize> {
        if self.grid.is_empty() {
            return None;
        }
        if self.cell_volume() > (SCAN_FACTOR * points.len() + SCAN_MIN_CELLS) as f64 {
            return nearest_by_scan(points, query);
        }

        // Cells beyond the occupied box are equivalent to the box's outer layer;
        // clamping keeps the ring arithmetic small. A clamped axis is still at
        // least `r` cells from any point in ring `r`, so the pruning bound holds.
        let clamp = |v: f64, lo: i64, hi: i64| {
            let lo = lo.saturating_sub(1);
            let hi = hi.saturating_add(1);
            if v.is_nan() {
                lo
            } else {
                v.clamp(lo as f64, hi as f64) as i64
            }
        };
        let q = (
            clamp((query.x / self.step).floor(), self.cell_min.0, self.cell_max.0),
            clamp((query.y / self.step).floor(), self.cell_min.1, self.cell_max.1),
            clamp((query.z / self.step).floor(), self.cell_min.2, self.cell_max.2),
        );

        let dist_to_range = |v: i64, lo: i64, hi: i64| {
            if v < lo {
                lo.saturating_sub(v)
            } else if v > hi {
                v.saturating_sub(hi)
            } else {
                0
            }
        };
        let reach_of = |v: i64, lo: i64, hi: i64| {
            v.saturating_sub(lo).saturating_abs().max(v.saturating_sub(hi).saturating_abs())
        };
        let first_ring = dist_to_range(q.0, self.cell_min.0, self.cell_max.0)
            .max(dist_to_range(q.1, self.cell_min.1, self.cell_max.1))
            .max(dist_to_range(q.2, self.cell_min.2, self.cell_max.2));
        let last_ring = reach_of(q.0, self.cell_min.0, self.cell_max.0)
            .max(reach_of(q.1, self.cell_min.1, self.cell_max.1))
            .max(reach_of(q.2, self.cell_min.2, self.cell_max.2));

        let mut best: Option<(f64, usize)> = None;
        let visit = |best: &mut Option<(f64, usize)>, cell: Cell| {
            let Some(indices) = self.grid.get(&cell) else {
                return;
            };
            for &idx in indices {
                let d2 = points[idx].distance_squared(&query);
                let better = match *best {
                    None => true,
                    Some((bd2, bidx)) => d2 < bd2 || (d2 == bd2 && idx < bidx),
                };
                if better {
                    *best = Some((d2, idx));
                }
            }
        };

        for r in first_ring..=last_ring {
            if let Some((d2, _)) = best {
                // Every point in ring r is at least (r - 1) cells away.
                let reach = (r - 1) as f64 * self.step;
                if reach > 0. && reach * reach > d2 {
                    break;
                }
            }

            let (ilo, ihi) = clip(q.0, r, self.cell_min.0, self.cell_max.0);
            let (jlo, jhi) = clip(q.1, r, self.cell_min.1, self.cell_max.1);
            let (klo, khi) = clip(q.2, r, self.cell_min.2, self.cell_max.2);
            for i in ilo..=ihi {
                let i_on_shell = i.abs_diff(q.0) == r.unsigned_abs();
                for j in jlo..=jhi {
                    if i_on_shell || j.abs_diff(q.1) == r.unsigned_abs() {
                        for k in klo..=khi {
                            visit(&mut best, (i, j, k));
                        }
                    } else {
                        // Interior column: only the two caps belong to the shell.
                        let below = q.2.saturating_sub(r);
                        let above = q.2.saturating_add(r);
                        if (klo..=khi).contains(&below) {
                            visit(&mut best, (i, j, below));
                        }
                        if above != below && (klo..=khi).contains(&above) {
                            visit(&mut best, (i, j, above));
                        }
                    }
                }
            }
        }

        best.map(|(_, idx)| idx)
    }

    /// Number of cells in the occupied box.
    fn cell_volume(&self) -> f64 {
        let span = |lo: i64, hi: i64| hi as f64 - lo as f64 + 1.;
        span(self.cell_min.0, self.cell_max.0)
            * span(self.cell_min.1, self.cell_max.1)
            * span(self.cell_min.2, self.cell_max.2)
    }
}

/// Above this many cells per point the ring search costs more than a scan.
const SCAN_FACTOR: usize = 64;
const SCAN_MIN_CELLS: usize = 4096;

/// Cells `[v - r, v + r]` clipped to `[lo, hi]`. May be empty.
fn clip(v: i64, r: i64, lo: i64, hi: i64) -> (i64, i64) {
    (v.saturating_sub(r).max(lo), v.saturating_add(r).min(hi))
}

fn nearest_by_scan(points: &[Point], query: Point) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    for (idx, p) in points.iter().enumerate() {
        let d2 = p.distance_squared(&query);
        if best.is_none_or(|(bd2, _)| d2 < bd2) {
            best = Some((d2, idx));
        }
    }
    best.map(|(_, idx)| idx)
}

fn cell_of(p: Point, step: f64) -> Cell {
    (
        (p.x / step).floor() as i64,
        (p.y / step).floor() as i64,
        (p.z / step).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[Point], query: Point) -> usize {
        let mut best = 0;
        for (i, p) in points.iter().enumerate() {
            if p.distance_squared(&query) < points[best].distance_squared(&query) {
                best = i;
            }
        }
        best
    }

    fn lattice() -> Vec<Point> {
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                for k in 0..4 {
                    pts.push(Point::new(
                        i as f64 * 0.7 + (j as f64) * 0.01,
                        j as f64 * 1.3,
                        k as f64 * 0.9 - (i as f64) * 0.02,
                    ));
                }
            }
        }
        pts
    }

    #[test]
    fn test_matches_brute_force() {
        let pts = lattice();
        let grid = PointGrid::with_auto_step(&pts);
        let queries = [
            Point::new(0.1, 0.2, 0.3),
            Point::new(2.05, 3.1, 1.7),
            Point::new(-10., 2., 2.),
            Point::new(50., 50., 50.),
            Point::new(1.75, 0.0, 2.71),
        ];
        for q in queries {
            assert_eq!(grid.nearest(&pts, q), Some(brute_force(&pts, q)));
        }
    }

    #[test]
    fn test_far_query_finds_nearest() {
        let pts = vec![Point::new(0., 0., 0.), Point::new(1., 0., 0.)];
        let grid = PointGrid::new(&pts, 0.1);
        assert_eq!(grid.nearest(&pts, Point::new(1000., 0., 0.)), Some(1));
        assert_eq!(grid.nearest(&pts, Point::new(-1000., 5., 5.)), Some(0));
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let pts = vec![
            Point::new(2., 0., 0.),
            Point::new(0., 0., 0.),
            Point::new(0., 0., 0.),
        ];
        let grid = PointGrid::new(&pts, 0.5);
        // Equidistant from index 0 and index 1/2.
        assert_eq!(grid.nearest(&pts, Point::new(1., 0., 0.)), Some(0));
        // Duplicate points: the lower index wins.
        assert_eq!(grid.nearest(&pts, Point::new(0., 0.1, 0.)), Some(1));
    }

    #[test]
    fn test_empty_grid() {
        let grid = PointGrid::with_auto_step(&[]);
        assert!(grid.is_empty());
        assert_eq!(grid.nearest(&[], Point::origin()), None);
    }

    #[test]
    fn test_very_distant_query() {
        // Query cells far beyond the i64 range.
        let pts = vec![Point::new(0., 0., 0.), Point::new(4000., 0., 0.)];
        let grid = PointGrid::new(&pts, 1.);
        assert_eq!(grid.nearest(&pts, Point::new(1e19, 0., 0.)), Some(1));
        assert_eq!(grid.nearest(&pts, Point::new(-1e19, 0., 0.)), Some(0));

        let pts = vec![Point::new(-1., 0., 0.), Point::new(1., 0., 0.)];
        let grid = PointGrid::with_auto_step(&pts);
        for q in [
            Point::new(1e30, 0., 0.),
            Point::new(-1e30, 0., 0.),
            Point::new(-1e30, 1e30, -1e30),
            Point::new(0., f64::MAX, 0.),
            Point::new(1e19, 2., 3.),
        ] {
            assert_eq!(grid.nearest(&pts, q), Some(brute_force(&pts, q)));
        }
    }

    #[test]
    fn test_distant_points() {
        let pts = vec![
            Point::new(1e30, 0., 0.),
            Point::new(-1e30, 0., 0.),
            Point::new(0., 0., 0.),
        ];
        let grid = PointGrid::new(&pts, 0.1);
        assert_eq!(grid.nearest(&pts, Point::new(6e29, 0., 0.)), Some(0));
        assert_eq!(grid.nearest(&pts, Point::new(1., 1., 1.)), Some(2));

        // Every point sits in a saturated cell column.
        let pts = vec![Point::new(1e30, 0., 0.), Point::new(1e30, 1., 0.)];
        let grid = PointGrid::new(&pts, 0.1);
        for q in [Point::origin(), Point::new(1e30, 0.9, 0.), Point::new(-1e30, 5., 0.)] {
            assert_eq!(grid.nearest(&pts, q), Some(brute_force(&pts, q)));
        }
    }

    #[test]
    fn test_sparse_grid_matches_brute_force() {
        // Two far-apart clusters with a small cell size fall back to a scan.
        let mut pts = lattice();
        pts.extend(lattice().into_iter().map(|p| Point::new(p.x + 1e6, p.y, p.z)));
        let grid = PointGrid::new(&pts, 0.5);
        for q in [
            Point::new(5e5, 1., 1.),
            Point::new(1e6 + 2., 3., 1.),
            Point::new(1.2, 2.2, 0.4),
        ] {
            assert_eq!(grid.nearest(&pts, q), Some(brute_force(&pts, q)));
        }
    }

    #[test]
    fn test_dense_interior_queries_match_brute_force() {
        let pts = lattice();
        let grid = PointGrid::new(&pts, 0.3);
        for i in 0..20 {
            let t = i as f64 / 20.;
            let q = Point::new(t * 4., 5. - t * 5., 0.5 + t * 2.);
            assert_eq!(grid.nearest(&pts, q), Some(brute_force(&pts, q)));
        }
    }

    #[test]
    fn test_degenerate_step() {
        let pts = vec![Point::new(1., 1., 1.)];
        let grid = PointGrid::with_auto_step(&pts);
        assert_eq!(grid.step(), 1.);
        assert_eq!(grid.nearest(&pts, Point::origin()), Some(0));
    }
}
