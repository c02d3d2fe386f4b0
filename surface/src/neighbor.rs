//! Weighted neighbor averaging used by the stepping rule.
//!
//! Axis neighbors contribute their raw height. Diagonal neighbors are pulled
//! toward the center first (`center + (diagonal - center) / √2`) because they
//! sit √2 further away. Only in-bounds neighbors are counted, so a corner
//! averages 3 values, an edge 5 and an interior cell 8. Frozen cells still
//! contribute their current height.

use crate::constants::DIAGONAL_ATTENUATION;

/// Accumulated neighbor contributions for one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeighborSample {
    pub sum: f32,
    pub count: u32,
}

impl NeighborSample {
    #[inline]
    fn add(&mut self, value: f32) {
        self.sum += value;
        self.count += 1;
    }

    /// Mean of the collected contributions.
    #[inline]
    pub fn average(&self) -> f32 {
        self.sum / self.count as f32
    }
}

/// Diagonal contribution, attenuated toward the center value.
#[inline(always)]
pub fn attenuate_diagonal(center: f32, diagonal: f32) -> f32 {
    center + (diagonal - center) / DIAGONAL_ATTENUATION
}

/// Collects the neighbors of `(row, col)` in a `width` x `rows` grid.
///
/// `heights` may be a strip of a larger grid: rows outside `0..rows` are
/// treated as out of bounds.
#[inline]
pub fn neighbor_sample(
    heights: &[f32],
    width: usize,
    rows: usize,
    row: usize,
    col: usize,
) -> NeighborSample {
    let index = row * width + col;
    let center = heights[index];
    let has_left = col > 0;
    let has_right = col + 1 < width;
    let mut sample = NeighborSample::default();

    if row > 0 {
        let up = index - width;
        sample.add(heights[up]);
        if has_left {
            sample.add(attenuate_diagonal(center, heights[up - 1]));
        }
        if has_right {
            sample.add(attenuate_diagonal(center, heights[up + 1]));
        }
    }

    if row + 1 < rows {
        let down = index + width;
        sample.add(heights[down]);
        if has_left {
            sample.add(attenuate_diagonal(center, heights[down - 1]));
        }
        if has_right {
            sample.add(attenuate_diagonal(center, heights[down + 1]));
        }
    }

    if has_left {
        sample.add(heights[index - 1]);
    }
    if has_right {
        sample.add(heights[index + 1]);
    }

    sample
}

/// Weighted mean of the in-bounds neighbors of `(row, col)`.
#[inline]
pub fn neighbor_average(heights: &[f32], width: usize, rows: usize, row: usize, col: usize) -> f32 {
    neighbor_sample(heights, width, rows, row, col).average()
}
