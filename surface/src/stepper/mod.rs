//! Surface stepping.
//!
//! One step advances every active cell from a read-only snapshot of the
//! previous state:
//!
//! ```text
//! avg         = neighbor_average(height, row, col)
//! velocity'   = (velocity + (avg - height) * fluidity) * damping
//! height'     = height + velocity' * dt
//! ```
//!
//! Cells frozen by the active mask keep their height and velocity but are
//! still read as neighbors.
//!
//! ## Backends
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │   SurfaceStepper     │  seed / step / release
//!                 └──────────┬───────────┘
//!            ┌───────────────┴───────────────┐
//!            ▼                               ▼
//!   ┌─────────────────┐            ┌──────────────────────┐
//!   │  DirectStepper  │            │   BatchedStepper     │
//!   │ whole grid,     │            │ strip plan + arena   │
//!   │ double-buffered │            │ parallel dispatches  │
//!   └─────────────────┘            └──────────────────────┘
//! ```
//!
//! Both keep their own copy of the seeded state between steps. Callers
//! re-seed whenever the surface was changed from outside (a wave, a new mask).

pub mod arena;
pub mod batched;
pub mod direct;
pub mod strips;

pub use arena::DispatchArena;
pub use batched::BatchedStepper;
pub use direct::DirectStepper;
pub use strips::{StripPlan, StripWindow};

use bevy::math::Vec3;

use crate::config::{BackendKind, BatchConfig, SimulationParameters};
use crate::error::{SurfaceError, SurfaceResult};
use crate::field::{GridDims, HeightField};
use crate::neighbor::neighbor_average;

/// Borrowed result of one step, valid until the stepper is used again.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    pub heights: &'a [f32],
    pub velocities: &'a [f32],
    /// Interior normals; border entries stay `Vec3::ZERO`.
    pub normals: &'a [Vec3],
}

/// Common contract of every stepping strategy.
///
/// Implementations must produce the same heights and velocities for the same
/// seeded state and parameters.
pub trait SurfaceStepper: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Replaces the cached state with a copy of `field`.
    ///
    /// The first seed fixes the grid dimensions; seeding a different size
    /// afterwards fails with `DimensionsLocked`.
    fn seed(&mut self, field: &HeightField) -> SurfaceResult<()>;

    fn is_seeded(&self) -> bool;

    /// Advances the cached state by `dt` and returns the new state.
    fn step(&mut self, params: &SimulationParameters, dt: f32) -> SurfaceResult<StepView<'_>>;

    /// Drops cached state and any buffers. The next step needs a new seed.
    fn release(&mut self);
}

/// Builds the stepper selected by `kind`.
pub fn make_stepper(kind: BackendKind, batch: BatchConfig) -> SurfaceResult<Box<dyn SurfaceStepper>> {
    Ok(match kind {
        BackendKind::Direct => Box::new(DirectStepper::new()),
        BackendKind::Batched => Box::new(BatchedStepper::new(batch)?),
    })
}

/// Read-only view of the grid (or strip) a step reads from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StencilInput<'a> {
    pub heights: &'a [f32],
    pub velocities: &'a [f32],
    pub mask: Option<&'a [bool]>,
    pub width: usize,
    pub rows: usize,
}

impl<'a> StencilInput<'a> {
    pub fn from_field(field: &'a HeightField) -> Self {
        let dims = field.dims();
        Self {
            heights: field.heights(),
            velocities: field.velocities(),
            mask: field.mask(),
            width: dims.width(),
            rows: dims.height(),
        }
    }
}

/// New `(height, velocity)` of a single cell.
#[inline]
pub(crate) fn advance_cell(
    input: &StencilInput<'_>,
    row: usize,
    col: usize,
    params: &SimulationParameters,
    dt: f32,
) -> (f32, f32) {
    let index = row * input.width + col;
    let height = input.heights[index];
    let velocity = input.velocities[index];

    if input.mask.is_some_and(|mask| !mask[index]) {
        return (height, velocity);
    }

    let average = neighbor_average(input.heights, input.width, input.rows, row, col);
    let velocity = (velocity + (average - height) * params.fluidity_factor) * params.damping_factor;
    (height + velocity * dt, velocity)
}

/// Advances one row into the given output rows (each `width` long).
#[inline]
pub(crate) fn advance_row(
    input: &StencilInput<'_>,
    row: usize,
    params: &SimulationParameters,
    dt: f32,
    out_heights: &mut [f32],
    out_velocities: &mut [f32],
) {
    for col in 0..input.width {
        let (height, velocity) = advance_cell(input, row, col, params, dt);
        out_heights[col] = height;
        out_velocities[col] = velocity;
    }
}

/// Shared seeding rule: lock dimensions on first use, copy state afterwards.
pub(crate) fn seed_cache(
    cache: &mut Option<HeightField>,
    locked: &mut Option<GridDims>,
    field: &HeightField,
) -> SurfaceResult<()> {
    let dims = field.dims();
    match *locked {
        Some(existing) if existing != dims => {
            return Err(SurfaceError::DimensionsLocked {
                width: existing.width(),
                height: existing.height(),
            });
        }
        Some(_) => {}
        None => *locked = Some(dims),
    }

    match cache {
        Some(cached) => cached.clone_from(field),
        None => *cache = Some(field.clone()),
    }
    Ok(())
}
