//! Fixed-capacity dispatch buffers for the batched backend.
//!
//! The arena plays the role of device-resident memory: it is allocated once,
//! sized for the tallest strip window, never resized, and released either
//! explicitly or when dropped. A dispatch runs the stepping kernel over the
//! uploaded window with one parallel work item per row. Work items only read
//! the uploaded input buffers and only write the output buffers, so every read
//! happens against the pre-step state.

use std::ops::Range;

use bevy::math::Vec3;
use rayon::prelude::*;

use super::{advance_row, StencilInput, StripWindow};
use crate::config::SimulationParameters;
use crate::error::{SurfaceError, SurfaceResult};
use crate::field::HeightField;
use crate::normals::reconstruct_row_normals;

pub struct DispatchArena {
    width: usize,
    capacity_rows: usize,
    /// Rows uploaded by the last `upload` call.
    rows: usize,
    has_mask: bool,

    heights: Vec<f32>,
    velocities: Vec<f32>,
    mask: Vec<bool>,

    out_heights: Vec<f32>,
    out_velocities: Vec<f32>,
    out_normals: Vec<Vec3>,
}

impl DispatchArena {
    pub fn allocate(width: usize, capacity_rows: usize) -> Self {
        let cells = width * capacity_rows;
        log::debug!(
            "Allocating dispatch arena: {} rows x {} columns ({} cells)",
            capacity_rows,
            width,
            cells
        );

        Self {
            width,
            capacity_rows,
            rows: 0,
            has_mask: false,
            heights: vec![0.0; cells],
            velocities: vec![0.0; cells],
            mask: vec![true; cells],
            out_heights: vec![0.0; cells],
            out_velocities: vec![0.0; cells],
            out_normals: vec![Vec3::ZERO; cells],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn capacity_rows(&self) -> usize {
        self.capacity_rows
    }

    #[inline]
    pub fn capacity_cells(&self) -> usize {
        self.width * self.capacity_rows
    }

    /// Copies the rows of `window` from `field` into the input buffers.
    pub fn upload(&mut self, field: &HeightField, window: &StripWindow) -> SurfaceResult<()> {
        let requested = window.rows() * self.width;
        if window.rows() > self.capacity_rows || field.dims().width() != self.width {
            return Err(SurfaceError::CapacityExceeded {
                requested,
                capacity: self.capacity_cells(),
            });
        }

        let source = window.start * self.width..window.end * self.width;
        self.heights[..requested].copy_from_slice(&field.heights()[source.clone()]);
        self.velocities[..requested].copy_from_slice(&field.velocities()[source.clone()]);
        match field.mask() {
            Some(mask) => {
                self.mask[..requested].copy_from_slice(&mask[source]);
                self.has_mask = true;
            }
            None => self.has_mask = false,
        }
        self.rows = window.rows();
        Ok(())
    }

    /// Steps the uploaded window and reconstructs its normals.
    pub fn dispatch(&mut self, params: &SimulationParameters, dt: f32) {
        let cells = self.rows * self.width;
        let width = self.width;
        let rows = self.rows;
        let Self {
            heights,
            velocities,
            mask,
            out_heights,
            out_velocities,
            out_normals,
            has_mask,
            ..
        } = self;

        let input = StencilInput {
            heights: &heights[..cells],
            velocities: &velocities[..cells],
            mask: has_mask.then_some(&mask[..cells]),
            width,
            rows,
        };

        out_heights[..cells]
            .par_chunks_mut(width)
            .zip(out_velocities[..cells].par_chunks_mut(width))
            .enumerate()
            .for_each(|(row, (row_heights, row_velocities))| {
                advance_row(&input, row, params, dt, row_heights, row_velocities);
            });

        let stepped = &out_heights[..cells];
        out_normals[..cells]
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, row_normals)| {
                row_normals.fill(Vec3::ZERO);
                reconstruct_row_normals(stepped, width, rows, row, row_normals);
            });
    }

    /// Output of the last dispatch for the given local rows.
    pub fn download(&self, local_rows: Range<usize>) -> (&[f32], &[f32], &[Vec3]) {
        debug_assert!(local_rows.end <= self.rows);
        let cells = local_rows.start * self.width..local_rows.end * self.width;
        (
            &self.out_heights[cells.clone()],
            &self.out_velocities[cells.clone()],
            &self.out_normals[cells],
        )
    }

    /// Frees the buffers.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DispatchArena {
    fn drop(&mut self) {
        log::debug!(
            "Releasing dispatch arena of {} cells",
            self.capacity_cells()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::GridDims;
    use crate::stepper::{DirectStepper, SurfaceStepper};

    fn window(start: usize, end: usize) -> StripWindow {
        StripWindow {
            start,
            end,
            keep_start: start,
            keep_end: end,
        }
    }

    #[test]
    fn test_upload_rejects_oversized_window() {
        let field = HeightField::flat(GridDims::new(4, 10).unwrap(), 1.0);
        let mut arena = DispatchArena::allocate(4, 3);
        assert_eq!(
            arena.upload(&field, &window(0, 4)),
            Err(SurfaceError::CapacityExceeded {
                requested: 16,
                capacity: 12
            })
        );
        assert!(arena.upload(&field, &window(2, 5)).is_ok());
    }

    #[test]
    fn test_full_window_dispatch_matches_direct() {
        let dims = GridDims::new(5, 4).unwrap();
        let heights: Vec<f32> = (0..20).map(|i| (i % 7) as f32 * 0.5).collect();
        let field = HeightField::from_parts(dims, heights, vec![0.0; 20]).unwrap();
        let params = SimulationParameters::default();

        let mut arena = DispatchArena::allocate(5, 4);
        arena.upload(&field, &window(0, 4)).unwrap();
        arena.dispatch(&params, 0.02);
        let (heights, velocities, normals) = arena.download(0..4);

        let mut direct = DirectStepper::new();
        direct.seed(&field).unwrap();
        let view = direct.step(&params, 0.02).unwrap();

        assert_eq!(heights, view.heights);
        assert_eq!(velocities, view.velocities);
        assert_eq!(normals, view.normals);
    }

    #[test]
    fn test_mask_is_cleared_by_unmasked_upload() {
        let dims = GridDims::new(3, 3).unwrap();
        let mut raised = HeightField::flat(dims, 0.0);
        raised.heights_mut()[4] = 1.0;
        let masked = raised.clone().with_mask(vec![false; 9]).unwrap();
        let params = SimulationParameters::default();

        let mut arena = DispatchArena::allocate(3, 3);
        arena.upload(&masked, &window(0, 3)).unwrap();
        arena.dispatch(&params, 0.02);
        assert_eq!(arena.download(1..2).0, &[0.0, 1.0, 0.0]);

        arena.upload(&raised, &window(0, 3)).unwrap();
        arena.dispatch(&params, 0.02);
        assert!(arena.download(1..2).0[1] < 1.0);
    }
}
