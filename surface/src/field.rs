//! Height field data model.
//!
//! Grids are stored row-major: the cell at `(row, col)` lives at
//! `row * width + col`. Heights and velocities are always co-indexed, and the
//! optional active mask follows the same layout.

use serde::{Deserialize, Serialize};

use crate::constants::MIN_GRID_SIDE;
use crate::error::{SurfaceError, SurfaceResult};

/// Fixed grid size of a simulation.
///
/// Only built through `GridDims::new`, so both sides are at least
/// `MIN_GRID_SIDE`. Deserialized values are re-checked by their consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    width: usize,
    height: usize,
}

impl GridDims {
    pub fn new(width: usize, height: usize) -> SurfaceResult<Self> {
        if width < MIN_GRID_SIDE || height < MIN_GRID_SIDE {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Fails unless these dimensions would pass `GridDims::new`.
    pub fn validate(&self) -> SurfaceResult<()> {
        Self::new(self.width, self.height).map(|_| ())
    }

    /// Total number of cells.
    #[inline]
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Index of a signed position, or `None` when it falls outside the grid.
    #[inline]
    pub fn checked_index(&self, row: i32, col: i32) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.height && col < self.width).then(|| self.index(row, col))
    }

    /// Fails with `SizeMismatch` unless `len` equals the cell count.
    pub fn check_len(&self, name: &'static str, len: usize) -> SurfaceResult<()> {
        if len != self.cells() {
            return Err(SurfaceError::SizeMismatch {
                name,
                expected: self.cells(),
                actual: len,
            });
        }
        Ok(())
    }
}

/// Heights, velocities and the optional active mask of one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightField {
    dims: GridDims,
    heights: Vec<f32>,
    velocities: Vec<f32>,
    mask: Option<Vec<bool>>,
}

impl HeightField {
    /// A still surface at a uniform level.
    pub fn flat(dims: GridDims, level: f32) -> Self {
        Self {
            dims,
            heights: vec![level; dims.cells()],
            velocities: vec![0.0; dims.cells()],
            mask: None,
        }
    }

    /// Builds a field from caller buffers, rejecting any length mismatch.
    pub fn from_parts(
        dims: GridDims,
        heights: Vec<f32>,
        velocities: Vec<f32>,
    ) -> SurfaceResult<Self> {
        dims.check_len("height", heights.len())?;
        dims.check_len("velocity", velocities.len())?;
        Ok(Self {
            dims,
            heights,
            velocities,
            mask: None,
        })
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> SurfaceResult<Self> {
        self.set_mask(Some(mask))?;
        Ok(self)
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    #[inline]
    pub fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    #[inline]
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    #[inline]
    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// Replaces the height buffer.
    pub fn set_heights(&mut self, heights: Vec<f32>) -> SurfaceResult<()> {
        self.dims.check_len("height", heights.len())?;
        self.heights = heights;
        Ok(())
    }

    /// Replaces the velocity buffer.
    pub fn set_velocities(&mut self, velocities: Vec<f32>) -> SurfaceResult<()> {
        self.dims.check_len("velocity", velocities.len())?;
        self.velocities = velocities;
        Ok(())
    }

    /// Installs or clears the active mask (`true` = simulated).
    pub fn set_mask(&mut self, mask: Option<Vec<bool>>) -> SurfaceResult<()> {
        if let Some(mask) = &mask {
            self.dims.check_len("mask", mask.len())?;
        }
        self.mask = mask;
        Ok(())
    }

    /// Exchanges the state buffers with a back buffer of the same size.
    pub(crate) fn swap_state(&mut self, heights: &mut Vec<f32>, velocities: &mut Vec<f32>) {
        debug_assert_eq!(heights.len(), self.dims.cells());
        debug_assert_eq!(velocities.len(), self.dims.cells());
        std::mem::swap(&mut self.heights, heights);
        std::mem::swap(&mut self.velocities, velocities);
    }

    /// Copies a step result into this field without reallocating.
    pub(crate) fn copy_state_from(&mut self, heights: &[f32], velocities: &[f32]) {
        self.heights.copy_from_slice(heights);
        self.velocities.copy_from_slice(velocities);
    }

    #[inline]
    pub fn height_at(&self, row: usize, col: usize) -> f32 {
        self.heights[self.dims.index(row, col)]
    }

    #[inline]
    pub fn velocity_at(&self, row: usize, col: usize) -> f32 {
        self.velocities[self.dims.index(row, col)]
    }

    /// Returns false only for cells frozen by the mask.
    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.mask.as_ref().map_or(true, |mask| mask[index])
    }

    /// Sum of squared velocities over the grid.
    pub fn kinetic_energy(&self) -> f32 {
        self.velocities.iter().map(|v| v * v).sum()
    }

    pub fn stats(&self) -> SurfaceStats {
        let mut min_height = f32::INFINITY;
        let mut max_height = f32::NEG_INFINITY;
        let mut total = 0.0f64;
        for &h in &self.heights {
            min_height = min_height.min(h);
            max_height = max_height.max(h);
            total += h as f64;
        }

        SurfaceStats {
            kinetic_energy: self.kinetic_energy(),
            mean_height: (total / self.heights.len() as f64) as f32,
            min_height,
            max_height,
        }
    }
}

/// Summary of a surface, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceStats {
    /// Sum of squared velocities
    pub kinetic_energy: f32,
    pub mean_height: f32,
    pub min_height: f32,
    pub max_height: f32,
}
