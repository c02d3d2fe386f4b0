//! Localized wave injection.
//!
//! A wave is a radially symmetric raised-cosine bump added to the height
//! grid: `strength * max(0, cos(distance * π / radius))` for every cell closer
//! than `radius` to the center. Cells outside the grid are skipped silently,
//! so a hit near the border only raises the part of the bump that lands on
//! the grid. Frozen cells are skipped as well.

use std::f32::consts::PI;

use crate::config::SimulationParameters;
use crate::field::HeightField;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveInjector {
    /// Height added at the center.
    pub strength: f32,
    /// Distance (in cells) beyond which nothing is added.
    pub radius: f32,
}

impl WaveInjector {
    pub fn new(strength: f32, radius: f32) -> Self {
        Self { strength, radius }
    }

    pub fn from_params(params: &SimulationParameters) -> Self {
        Self::new(params.wave_strength, params.wave_radius)
    }

    /// Height added at `distance` cells from the center.
    #[inline]
    pub fn falloff(&self, distance: f32) -> f32 {
        if distance >= self.radius {
            return 0.0;
        }
        self.strength * (distance * PI / self.radius).cos().max(0.0)
    }

    /// Adds the bump centered on `(row, col)` and returns the number of grid
    /// cells inside the radius that were visited.
    ///
    /// Only the part of the bounding square that overlaps the grid is walked,
    /// so far-off centers and huge radii cost at most one pass over the grid.
    pub fn apply(&self, field: &mut HeightField, row: i32, col: i32) -> usize {
        if !(self.radius > 0.0) {
            return 0;
        }

        let dims = field.dims();
        let reach = self.radius.ceil() as i64;
        let Some(rows) = clipped_span(row, reach, dims.height()) else {
            return 0;
        };
        let Some(cols) = clipped_span(col, reach, dims.width()) else {
            return 0;
        };

        let mut touched = 0;
        for r in rows.0..=rows.1 {
            let dr = (r - row as i64) as f32;
            for c in cols.0..=cols.1 {
                let dc = (c - col as i64) as f32;
                let distance = (dr * dr + dc * dc).sqrt();
                if distance >= self.radius {
                    continue;
                }
                let index = dims.index(r as usize, c as usize);
                if !field.is_active(index) {
                    continue;
                }
                field.heights_mut()[index] += self.falloff(distance);
                touched += 1;
            }
        }

        touched
    }
}

/// Inclusive range of `center - reach..=center + reach` that lies in `0..len`.
fn clipped_span(center: i32, reach: i64, len: usize) -> Option<(i64, i64)> {
    let center = center as i64;
    let low = center.saturating_sub(reach).max(0);
    let high = center.saturating_add(reach).min(len as i64 - 1);
    (low <= high).then_some((low, high))
}
