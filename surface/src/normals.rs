//! Per-vertex normal reconstruction from a height grid.
//!
//! Vertices are placed at `(row, height, col)`. For every interior vertex the
//! four axis neighbors (east, south, west, north) form four triangles around
//! it; their unit face normals are averaged and normalized. Border vertices
//! are left untouched, so callers see whatever default the buffer held
//! (`Vec3::ZERO` for fresh buffers).
//!
//! A degenerate sum falls back to straight up (`Vec3::Y`), which is also the
//! normal of a flat surface, so no NaN can leak out.

use bevy::math::Vec3;

/// Normal used when the face normals cancel out.
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

#[inline]
fn vertex(row: usize, col: usize, height: f32) -> Vec3 {
    Vec3::new(row as f32, height, col as f32)
}

/// Normal of an interior vertex. `row` and `col` must not lie on the border.
pub fn vertex_normal(heights: &[f32], width: usize, row: usize, col: usize) -> Vec3 {
    let index = row * width + col;
    let center = vertex(row, col, heights[index]);
    let neighbors = [
        vertex(row, col + 1, heights[index + 1]),
        vertex(row + 1, col, heights[index + width]),
        vertex(row, col - 1, heights[index - 1]),
        vertex(row - 1, col, heights[index - width]),
    ];

    let mut sum = Vec3::ZERO;
    for (i, a) in neighbors.iter().enumerate() {
        let b = neighbors[(i + 1) % neighbors.len()];
        sum += (*a - center).cross(b - center).normalize_or_zero();
    }

    (sum / neighbors.len() as f32).normalize_or(FALLBACK_NORMAL)
}

/// Fills the normals of one row of a `width` x `rows` grid.
///
/// `out_row` holds exactly `width` entries for `row`. Border rows and the
/// first and last column are skipped.
pub fn reconstruct_row_normals(
    heights: &[f32],
    width: usize,
    rows: usize,
    row: usize,
    out_row: &mut [Vec3],
) {
    debug_assert_eq!(out_row.len(), width);
    if row == 0 || row + 1 >= rows {
        return;
    }
    for col in 1..width.saturating_sub(1) {
        out_row[col] = vertex_normal(heights, width, row, col);
    }
}

/// Fills `out` with normals for every interior vertex of the grid.
pub fn reconstruct_normals(heights: &[f32], width: usize, rows: usize, out: &mut [Vec3]) {
    debug_assert_eq!(heights.len(), width * rows);
    debug_assert_eq!(out.len(), width * rows);
    for (row, out_row) in out.chunks_exact_mut(width).enumerate() {
        reconstruct_row_normals(heights, width, rows, row, out_row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_surface_points_up() {
        let heights = vec![3.0f32; 16];
        let mut normals = vec![Vec3::ZERO; 16];
        reconstruct_normals(&heights, 4, 4, &mut normals);

        for row in 1..3 {
            for col in 1..3 {
                let n = normals[row * 4 + col];
                assert!((n - Vec3::Y).length() < 1e-6, "normal {n:?} at {row},{col}");
            }
        }
    }

    #[test]
    fn test_border_vertices_keep_default() {
        let heights = vec![1.0f32; 9];
        let mut normals = vec![Vec3::ZERO; 9];
        reconstruct_normals(&heights, 3, 3, &mut normals);

        for (i, n) in normals.iter().enumerate() {
            if i == 4 {
                assert!((*n - Vec3::Y).length() < 1e-6);
            } else {
                assert_eq!(*n, Vec3::ZERO);
            }
        }
    }

    #[test]
    fn test_slope_tilts_normal_away_from_rising_rows() {
        // Height grows with the row index, so the normal leans toward -row (x).
        let mut heights = vec![0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                heights[row * 3 + col] = row as f32;
            }
        }
        let n = vertex_normal(&heights, 3, 1, 1);
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.x < 0.0);
        assert!(n.z.abs() < 1e-6);
        assert!(n.y > 0.0);
    }

    #[test]
    fn test_non_finite_heights_fall_back_to_up() {
        let mut heights = vec![0.0f32; 9];
        heights[1] = f32::NAN;
        heights[3] = f32::NAN;
        heights[5] = f32::NAN;
        heights[7] = f32::NAN;
        let n = vertex_normal(&heights, 3, 1, 1);
        assert_eq!(n, FALLBACK_NORMAL);
    }

    #[test]
    fn test_normals_are_unit_length() {
        let heights: Vec<f32> = (0..25).map(|i| ((i * 7) % 5) as f32 * 0.3).collect();
        let mut normals = vec![Vec3::ZERO; 25];
        reconstruct_normals(&heights, 5, 5, &mut normals);
        for row in 1..4 {
            for col in 1..4 {
                assert!((normals[row * 5 + col].length() - 1.0).abs() < 1e-5);
            }
        }
    }
}
