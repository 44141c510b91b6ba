//! Surface normals of a density map read as a height field.

use common::parallel::par_fill_rows;
use common::Grid;
use glam::Vec3;

use crate::filters::{gradient_x, gradient_y};

/// Cells whose two derivatives are both below this are treated as flat and
/// keep their raw, unnormalized normal.
pub const FLAT_EPSILON: f32 = 1e-4;

/// Per-cell surface normal, same shape as the height field.
pub type NormalField = Grid<Vec3>;

/// Estimates normals of `height * eta` from central differences.
///
/// The raw normal is `(-0.5 * dx, -0.5 * dy, 1)`. `z` stays positive, so
/// every normal faces the viewer.
pub fn estimate_normals(height: &Grid<f32>, eta: f32) -> NormalField {
    let scaled = height.map(|v| v * eta);
    let dx = gradient_x(&scaled);
    let dy = gradient_y(&scaled);

    let (rows, cols) = height.shape();
    let mut cells = vec![Vec3::Z; rows * cols];
    par_fill_rows(&mut cells, cols, |row, out_row| {
        let dx_row = dx.row(row);
        let dy_row = dy.row(row);
        for ((n, &gx), &gy) in out_row.iter_mut().zip(dx_row).zip(dy_row) {
            *n = surface_normal(gx, gy);
        }
    });

    Grid::new(rows, cols, cells)
}

#[inline]
fn surface_normal(dx: f32, dy: f32) -> Vec3 {
    let raw = Vec3::new(-0.5 * dx, -0.5 * dy, 1.0);
    if dx.abs() < FLAT_EPSILON && dy.abs() < FLAT_EPSILON {
        raw
    } else {
        raw.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::float_ext::FloatExt;

    #[test]
    fn flat_map_points_straight_up() {
        let height = Grid::new_filled(4, 4, 5.0f32);
        let normals = estimate_normals(&height, 1.0);
        assert!(normals.cells().iter().all(|&n| n == Vec3::Z));
    }

    #[test]
    fn slope_tilts_against_the_gradient() {
        // Height rises along +x by 1 per column; interior dx = 2.
        let cells = (0..25).map(|i| (i % 5) as f32).collect();
        let normals = estimate_normals(&Grid::new(5, 5, cells), 1.0);
        let n = normals[(2, 2)];
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert!((n - expected).length() < 1e-6);
        assert!(n.length().near(1.0, 1e-6));
        // Border columns have zero derivative and stay flat.
        assert_eq!(normals[(2, 0)], Vec3::Z);
    }

    #[test]
    fn eta_exaggerates_slope() {
        let cells = (0..9).map(|i| (i / 3) as f32).collect();
        let grid = Grid::new(3, 3, cells);
        let soft = estimate_normals(&grid, 1.0)[(1, 1)];
        let steep = estimate_normals(&grid, 4.0)[(1, 1)];
        assert!(steep.z < soft.z);
        assert!(steep.y < soft.y);
    }

    #[test]
    fn tiny_gradients_skip_normalization() {
        let cells = (0..9).map(|i| (i % 3) as f32 * 1e-5).collect();
        let normals = estimate_normals(&Grid::new(3, 3, cells), 1.0);
        let n = normals[(1, 1)];
        let dx = gradient_x(&Grid::new(3, 3, (0..9).map(|i| (i % 3) as f32 * 1e-5).collect()));
        assert_eq!(n, Vec3::new(-0.5 * dx[(1, 1)], 0.0, 1.0));
    }
}
