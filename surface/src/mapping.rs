//! World-space to grid-cell conversion.
//!
//! The surface spans a square of `real_size` world units starting at the
//! origin. World `x` runs along grid rows and world `z` along grid columns;
//! the world `y` axis is height.

use bevy::math::Vec3;

use crate::field::GridDims;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapping {
    dims: GridDims,
    real_size: f32,
}

impl GridMapping {
    pub fn new(dims: GridDims, real_size: f32) -> Self {
        Self { dims, real_size }
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn real_size(&self) -> f32 {
        self.real_size
    }

    /// Nearest `(row, col)` to a world position. The result may fall outside
    /// the grid; wave injection clips it.
    pub fn world_to_cell(&self, x: f32, z: f32) -> (i32, i32) {
        let row = (x * self.dims.height() as f32 / self.real_size).round();
        let col = (z * self.dims.width() as f32 / self.real_size).round();
        (row as i32, col as i32)
    }

    pub fn point_to_cell(&self, point: Vec3) -> (i32, i32) {
        self.world_to_cell(point.x, point.z)
    }

    /// World position of a cell at the given height.
    pub fn cell_to_world(&self, row: usize, col: usize, height: f32) -> Vec3 {
        Vec3::new(
            row as f32 * self.real_size / self.dims.height() as f32,
            height,
            col as f32 * self.real_size / self.dims.width() as f32,
        )
    }
}
