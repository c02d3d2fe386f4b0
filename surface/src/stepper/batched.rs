//! Strip-batched stepping through a fixed-capacity dispatch arena.
//!
//! The stepper keeps its own copy of the last state (the cached grid and
//! velocities). It must be seeded once with an explicit state and then keeps
//! advancing that cache; seeding again replaces it. Each step uploads every
//! strip window of the plan from the cache, dispatches it, and copies the kept
//! rows into the next full-grid buffers before swapping them in.

use bevy::math::Vec3;

use super::{seed_cache, DispatchArena, StepView, StripPlan, SurfaceStepper};
use crate::config::{BackendKind, BatchConfig, SimulationParameters};
use crate::error::{SurfaceError, SurfaceResult};
use crate::field::{GridDims, HeightField};

pub struct BatchedStepper {
    config: BatchConfig,
    cached: Option<HeightField>,
    locked: Option<GridDims>,
    plan: Option<StripPlan>,
    arena: Option<DispatchArena>,
    next_heights: Vec<f32>,
    next_velocities: Vec<f32>,
    normals: Vec<Vec3>,
}

impl BatchedStepper {
    pub fn new(config: BatchConfig) -> SurfaceResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cached: None,
            locked: None,
            plan: None,
            arena: None,
            next_heights: Vec::new(),
            next_velocities: Vec::new(),
            normals: Vec::new(),
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Strip plan of the seeded grid.
    pub fn plan(&self) -> Option<&StripPlan> {
        self.plan.as_ref()
    }
}

impl SurfaceStepper for BatchedStepper {
    fn kind(&self) -> BackendKind {
        BackendKind::Batched
    }

    fn seed(&mut self, field: &HeightField) -> SurfaceResult<()> {
        seed_cache(&mut self.cached, &mut self.locked, field)?;

        let dims = field.dims();
        if self.plan.is_none() {
            self.plan = Some(StripPlan::new(dims.height(), &self.config)?);
        }
        if self.arena.is_none() {
            let rows = self.plan.as_ref().map_or(dims.height(), StripPlan::max_window_rows);
            self.arena = Some(DispatchArena::allocate(dims.width(), rows));
        }

        let cells = dims.cells();
        self.next_heights.resize(cells, 0.0);
        self.next_velocities.resize(cells, 0.0);
        self.normals.resize(cells, Vec3::ZERO);
        Ok(())
    }

    fn is_seeded(&self) -> bool {
        self.cached.is_some()
    }

    fn step(&mut self, params: &SimulationParameters, dt: f32) -> SurfaceResult<StepView<'_>> {
        let Self {
            cached,
            plan,
            arena,
            next_heights,
            next_velocities,
            normals,
            ..
        } = self;
        let cached = cached.as_mut().ok_or(SurfaceError::NotInitialized)?;
        let plan = plan.as_ref().ok_or(SurfaceError::NotInitialized)?;
        let arena = arena.as_mut().ok_or(SurfaceError::NotInitialized)?;
        let width = cached.dims().width();

        for window in plan.windows() {
            arena.upload(cached, window)?;
            arena.dispatch(params, dt);

            let (heights, velocities, window_normals) = arena.download(window.local_kept());
            let kept = window.keep_start * width..window.keep_end * width;
            next_heights[kept.clone()].copy_from_slice(heights);
            next_velocities[kept.clone()].copy_from_slice(velocities);
            normals[kept].copy_from_slice(window_normals);
        }

        cached.swap_state(next_heights, next_velocities);

        Ok(StepView {
            heights: cached.heights(),
            velocities: cached.velocities(),
            normals: normals.as_slice(),
        })
    }

    fn release(&mut self) {
        if let Some(arena) = self.arena.take() {
            arena.release();
        }
        self.cached = None;
        self.next_heights = Vec::new();
        self.next_velocities = Vec::new();
        self.normals = Vec::new();
    }
}
