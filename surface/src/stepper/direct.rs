//! Whole-grid stepping in a single pass.

use bevy::math::Vec3;

use super::{advance_row, seed_cache, StencilInput, StepView, SurfaceStepper};
use crate::config::{BackendKind, SimulationParameters};
use crate::error::{SurfaceError, SurfaceResult};
use crate::field::{GridDims, HeightField};
use crate::normals::reconstruct_normals;

/// Evaluates every cell from the front buffer into a back buffer, then swaps.
#[derive(Debug, Default)]
pub struct DirectStepper {
    front: Option<HeightField>,
    back_heights: Vec<f32>,
    back_velocities: Vec<f32>,
    normals: Vec<Vec3>,
    locked: Option<GridDims>,
}

impl DirectStepper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurfaceStepper for DirectStepper {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn seed(&mut self, field: &HeightField) -> SurfaceResult<()> {
        seed_cache(&mut self.front, &mut self.locked, field)?;
        let cells = field.dims().cells();
        self.back_heights.resize(cells, 0.0);
        self.back_velocities.resize(cells, 0.0);
        self.normals.resize(cells, Vec3::ZERO);
        Ok(())
    }

    fn is_seeded(&self) -> bool {
        self.front.is_some()
    }

    fn step(&mut self, params: &SimulationParameters, dt: f32) -> SurfaceResult<StepView<'_>> {
        let front = self.front.as_mut().ok_or(SurfaceError::NotInitialized)?;
        let dims = front.dims();
        let width = dims.width();

        {
            let input = StencilInput::from_field(front);
            let rows = self
                .back_heights
                .chunks_exact_mut(width)
                .zip(self.back_velocities.chunks_exact_mut(width));
            for (row, (out_heights, out_velocities)) in rows.enumerate() {
                advance_row(&input, row, params, dt, out_heights, out_velocities);
            }
        }

        front.swap_state(&mut self.back_heights, &mut self.back_velocities);
        reconstruct_normals(front.heights(), width, dims.height(), &mut self.normals);

        Ok(StepView {
            heights: front.heights(),
            velocities: front.velocities(),
            normals: &self.normals,
        })
    }

    fn release(&mut self) {
        self.front = None;
        self.back_heights = Vec::new();
        self.back_velocities = Vec::new();
        self.normals = Vec::new();
    }
}
