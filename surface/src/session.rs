//! The long-lived simulation session.
//!
//! A `SurfaceSession` owns the authoritative `HeightField` and the stepper that
//! advances it. Callers mutate the field between steps (waves, masks, replaced
//! buffers); every such change marks the session dirty so the stepper is
//! re-seeded from the field before the next step.
//!
//! ## Lifecycle
//!
//! ```text
//!   new ──► first step_with(dims + heights + velocities) ──► step ──► step ...
//!              or initialize(field)                          ▲
//!                                                             │ wave / mask / buffers
//!                                                             └── re-seed on next step
//! ```
//!
//! Grid dimensions are fixed by the first initialization. A failure raised
//! while a step is in progress poisons the session: later mutating calls fail
//! with `SessionPoisoned`. Parameter setters only change configuration and stay
//! available.

use bevy::math::Vec3;
use bevy_ecs::resource::Resource;

use crate::config::{BackendKind, SimulationParameters, SurfaceConfig};
use crate::error::{SurfaceError, SurfaceResult};
use crate::field::{GridDims, HeightField, SurfaceStats};
use crate::snapshot::SurfaceSnapshot;
use crate::stepper::{make_stepper, SurfaceStepper};
use crate::wave::WaveInjector;

/// Optional inputs of a step call.
///
/// The first step of a session needs all three fields. Later steps may replace
/// the heights and/or velocities but must not pass dimensions again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepRequest {
    pub dims: Option<GridDims>,
    pub heights: Option<Vec<f32>>,
    pub velocities: Option<Vec<f32>>,
}

impl StepRequest {
    pub fn initial(dims: GridDims, heights: Vec<f32>, velocities: Vec<f32>) -> Self {
        Self {
            dims: Some(dims),
            heights: Some(heights),
            velocities: Some(velocities),
        }
    }
}

/// State after a step, borrowed from the session.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceFrame<'a> {
    pub heights: &'a [f32],
    pub velocities: &'a [f32],
    pub normals: &'a [Vec3],
}

#[derive(Resource)]
pub struct SurfaceSession {
    config: SurfaceConfig,
    stepper: Box<dyn SurfaceStepper>,
    field: Option<HeightField>,
    normals: Vec<Vec3>,
    /// The field changed since the stepper was last seeded.
    dirty: bool,
    poisoned: bool,
    steps: u64,
}

impl SurfaceSession {
    pub fn new(config: SurfaceConfig) -> SurfaceResult<Self> {
        let stepper = make_stepper(config.backend, config.batch)?;
        Ok(Self::with_stepper(config, stepper))
    }

    /// Builds a session around an existing stepper. `config.backend` is
    /// ignored in favor of the stepper's own kind.
    pub fn with_stepper(config: SurfaceConfig, stepper: Box<dyn SurfaceStepper>) -> Self {
        Self {
            config,
            stepper,
            field: None,
            normals: Vec::new(),
            dirty: true,
            poisoned: false,
            steps: 0,
        }
    }

    /// Rebuilds a session from a snapshot. The snapshot's parameters replace
    /// those of `config`.
    pub fn restore(mut config: SurfaceConfig, snapshot: SurfaceSnapshot) -> SurfaceResult<Self> {
        config.params = snapshot.params;
        let mut session = Self::new(config)?;
        session.initialize(snapshot.field)?;
        session.steps = snapshot.steps;
        Ok(session)
    }

    /// Installs the initial field and fixes the grid dimensions.
    pub fn initialize(&mut self, field: HeightField) -> SurfaceResult<()> {
        self.ensure_usable()?;
        if let Some(current) = &self.field {
            let dims = current.dims();
            return Err(SurfaceError::DimensionsLocked {
                width: dims.width(),
                height: dims.height(),
            });
        }

        let dims = field.dims();
        dims.validate()?;
        dims.check_len("height", field.heights().len())?;
        dims.check_len("velocity", field.velocities().len())?;
        log::info!(
            "Initializing {}x{} surface with the {:?} backend",
            dims.width(),
            dims.height(),
            self.stepper.kind()
        );
        self.normals = vec![Vec3::ZERO; dims.cells()];
        self.field = Some(field);
        self.dirty = true;
        Ok(())
    }

    /// Advances one step, optionally initializing or replacing state first.
    pub fn step_with(&mut self, request: StepRequest, dt: f32) -> SurfaceResult<SurfaceFrame<'_>> {
        self.ensure_usable()?;

        match self.field.as_mut() {
            None => {
                let StepRequest {
                    dims: Some(dims),
                    heights: Some(heights),
                    velocities: Some(velocities),
                } = request
                else {
                    return Err(SurfaceError::IncompleteInitialization);
                };
                let field = HeightField::from_parts(dims, heights, velocities)?;
                self.initialize(field)?;
            }
            Some(field) => {
                let dims = field.dims();
                if request.dims.is_some() {
                    return Err(SurfaceError::DimensionsLocked {
                        width: dims.width(),
                        height: dims.height(),
                    });
                }
                // Validate both before touching either.
                if let Some(heights) = &request.heights {
                    dims.check_len("height", heights.len())?;
                }
                if let Some(velocities) = &request.velocities {
                    dims.check_len("velocity", velocities.len())?;
                }
                if let Some(heights) = request.heights {
                    field.set_heights(heights)?;
                    self.dirty = true;
                }
                if let Some(velocities) = request.velocities {
                    field.set_velocities(velocities)?;
                    self.dirty = true;
                }
            }
        }

        self.run_step(dt)?;
        self.frame()
    }

    /// Advances one step from the cached state.
    pub fn step(&mut self, dt: f32) -> SurfaceResult<SurfaceFrame<'_>> {
        self.step_with(StepRequest::default(), dt)
    }

    /// Runs one frame worth of steps: `calls_scale` steps of
    /// `frame_dt * time_scale` each. Returns the number of steps taken.
    pub fn advance_frame(&mut self, frame_dt: f32) -> SurfaceResult<u32> {
        let timing = self.config.timing;
        let dt = frame_dt * timing.time_scale;
        for _ in 0..timing.calls_scale {
            self.ensure_usable()?;
            self.run_step(dt)?;
        }
        Ok(timing.calls_scale)
    }

    /// Adds a wave centered on `(row, col)` using the current strength and
    /// radius. Cells outside the grid are ignored. Returns the number of cells
    /// raised.
    pub fn apply_wave(&mut self, row: i32, col: i32) -> SurfaceResult<usize> {
        self.ensure_usable()?;
        let field = self.field.as_mut().ok_or(SurfaceError::NotInitialized)?;
        let touched = WaveInjector::from_params(&self.config.params).apply(field, row, col);
        if touched > 0 {
            self.dirty = true;
            log::debug!("Wave at ({}, {}) raised {} cells", row, col, touched);
        }
        Ok(touched)
    }

    /// Installs or clears the active mask. Takes effect on the next step.
    pub fn set_active_mask(&mut self, mask: Option<Vec<bool>>) -> SurfaceResult<()> {
        self.ensure_usable()?;
        let field = self.field.as_mut().ok_or(SurfaceError::NotInitialized)?;
        field.set_mask(mask)?;
        self.dirty = true;
        Ok(())
    }

    /// Re-seeds the stepper from the current field right away.
    pub fn reseed(&mut self) -> SurfaceResult<()> {
        self.ensure_usable()?;
        self.seed_stepper()
    }

    /// Frees the stepper's buffers. The field is kept and the next step
    /// re-seeds from it.
    pub fn release(&mut self) {
        self.stepper.release();
        self.dirty = true;
        log::debug!("Surface stepper released");
    }

    pub fn snapshot(&self) -> SurfaceResult<SurfaceSnapshot> {
        let field = self.field.as_ref().ok_or(SurfaceError::NotInitialized)?;
        Ok(SurfaceSnapshot {
            field: field.clone(),
            params: self.config.params,
            steps: self.steps,
        })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.config.params
    }

    pub fn set_params(&mut self, params: SimulationParameters) {
        self.config.params = params;
    }

    pub fn set_fluidity_factor(&mut self, value: f32) {
        self.config.params.fluidity_factor = value;
    }

    /// Sets the per-step velocity damping (the absorb factor).
    pub fn set_damping_factor(&mut self, value: f32) {
        self.config.params.damping_factor = value;
    }

    pub fn set_wave_strength(&mut self, value: f32) {
        self.config.params.wave_strength = value;
    }

    pub fn set_wave_radius(&mut self, value: f32) {
        self.config.params.wave_radius = value;
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn backend(&self) -> BackendKind {
        self.stepper.kind()
    }

    pub fn is_initialized(&self) -> bool {
        self.field.is_some()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn dims(&self) -> Option<GridDims> {
        self.field.as_ref().map(HeightField::dims)
    }

    pub fn field(&self) -> Option<&HeightField> {
        self.field.as_ref()
    }

    /// Normals from the last step. All zero before the first step.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stats(&self) -> Option<SurfaceStats> {
        self.field.as_ref().map(HeightField::stats)
    }

    fn ensure_usable(&self) -> SurfaceResult<()> {
        if self.poisoned {
            return Err(SurfaceError::SessionPoisoned);
        }
        Ok(())
    }

    fn frame(&self) -> SurfaceResult<SurfaceFrame<'_>> {
        let field = self.field.as_ref().ok_or(SurfaceError::NotInitialized)?;
        Ok(SurfaceFrame {
            heights: field.heights(),
            velocities: field.velocities(),
            normals: &self.normals,
        })
    }

    fn seed_stepper(&mut self) -> SurfaceResult<()> {
        let field = self.field.as_ref().ok_or(SurfaceError::NotInitialized)?;
        if let Err(err) = self.stepper.seed(field) {
            log::warn!("Seeding the surface stepper failed: {}", err);
            self.poisoned = true;
            return Err(err);
        }
        self.dirty = false;
        Ok(())
    }

    fn run_step(&mut self, dt: f32) -> SurfaceResult<()> {
        if self.field.is_none() {
            return Err(SurfaceError::NotInitialized);
        }
        if self.dirty || !self.stepper.is_seeded() {
            log::debug!("Re-seeding surface stepper from the current field");
            self.seed_stepper()?;
        }

        let Self {
            config,
            stepper,
            field,
            normals,
            poisoned,
            steps,
            ..
        } = self;
        let field = field.as_mut().ok_or(SurfaceError::NotInitialized)?;

        match stepper.step(&config.params, dt) {
            Ok(view) => {
                field.copy_state_from(view.heights, view.velocities);
                normals.clear();
                normals.extend_from_slice(view.normals);
                *steps += 1;
                Ok(())
            }
            Err(err) => {
                log::warn!("Surface step failed: {}", err);
                *poisoned = true;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;

    fn session() -> SurfaceSession {
        SurfaceSession::new(SurfaceConfig::default()).unwrap()
    }

    fn initial(width: usize, height: usize, level: f32) -> StepRequest {
        let dims = GridDims::new(width, height).unwrap();
        StepRequest::initial(dims, vec![level; dims.cells()], vec![0.0; dims.cells()])
    }

    /// Fails every step after seeding successfully.
    struct BrokenStepper {
        seeded: bool,
    }

    impl SurfaceStepper for BrokenStepper {
        fn kind(&self) -> BackendKind {
            BackendKind::Batched
        }

        fn seed(&mut self, _field: &HeightField) -> SurfaceResult<()> {
            self.seeded = true;
            Ok(())
        }

        fn is_seeded(&self) -> bool {
            self.seeded
        }

        fn step(
            &mut self,
            _params: &SimulationParameters,
            _dt: f32,
        ) -> SurfaceResult<crate::stepper::StepView<'_>> {
            Err(SurfaceError::CapacityExceeded {
                requested: 10,
                capacity: 5,
            })
        }

        fn release(&mut self) {
            self.seeded = false;
        }
    }

    #[test]
    fn test_first_step_requires_complete_arguments() {
        let mut session = session();
        let partial = StepRequest {
            dims: Some(GridDims::new(3, 3).unwrap()),
            heights: Some(vec![0.0; 9]),
            velocities: None,
        };
        assert_eq!(
            session.step_with(partial, 0.02).err(),
            Some(SurfaceError::IncompleteInitialization)
        );
        assert_eq!(session.step(0.02).err(), Some(SurfaceError::IncompleteInitialization));
        assert!(!session.is_initialized());
        assert!(!session.is_poisoned());
    }

    #[test]
    fn test_first_step_rejects_mismatched_buffers() {
        let mut session = session();
        let dims = GridDims::new(3, 3).unwrap();
        let request = StepRequest::initial(dims, vec![0.0; 9], vec![0.0; 4]);
        assert!(matches!(
            session.step_with(request, 0.02),
            Err(SurfaceError::SizeMismatch { .. })
        ));
        assert!(!session.is_initialized());
    }

    #[test]
    fn test_dimensions_are_locked_after_first_step() {
        let mut session = session();
        session.step_with(initial(4, 4, 1.0), 0.02).unwrap();

        let again = StepRequest {
            dims: Some(GridDims::new(4, 4).unwrap()),
            ..Default::default()
        };
        assert_eq!(
            session.step_with(again, 0.02).err(),
            Some(SurfaceError::DimensionsLocked {
                width: 4,
                height: 4
            })
        );
        assert!(session.initialize(HeightField::flat(GridDims::new(8, 8).unwrap(), 0.0)).is_err());
        // Precondition failures leave the session usable.
        assert!(session.step(0.02).is_ok());
    }

    #[test]
    fn test_decoded_degenerate_field_is_rejected() {
        // Same layout as a serialized `HeightField` with a 0x0 grid.
        let bytes = bincode::serialize(&(
            (0usize, 0usize),
            Vec::<f32>::new(),
            Vec::<f32>::new(),
            None::<Vec<bool>>,
        ))
        .unwrap();
        let field: HeightField = bincode::deserialize(&bytes).unwrap();

        let mut session = session();
        assert_eq!(
            session.initialize(field).err(),
            Some(SurfaceError::InvalidDimensions {
                width: 0,
                height: 0
            })
        );
        assert!(!session.is_initialized());
        assert!(!session.is_poisoned());
        assert_eq!(session.step(0.02).err(), Some(SurfaceError::IncompleteInitialization));
    }

    #[test]
    fn test_later_steps_validate_both_buffers_before_replacing() {
        let mut session = session();
        session.step_with(initial(3, 3, 1.0), 0.02).unwrap();

        let request = StepRequest {
            dims: None,
            heights: Some(vec![5.0; 9]),
            velocities: Some(vec![0.0; 2]),
        };
        assert!(session.step_with(request, 0.02).is_err());
        assert!(session.field().unwrap().heights().iter().all(|&h| h == 1.0));
    }

    #[test]
    fn test_replaced_heights_are_used_by_next_step() {
        let mut session = session();
        session.step_with(initial(3, 3, 1.0), 0.02).unwrap();
        let request = StepRequest {
            heights: Some(vec![7.0; 9]),
            ..Default::default()
        };
        let frame = session.step_with(request, 0.02).unwrap();
        assert!(frame.heights.iter().all(|&h| h == 7.0));
        assert_eq!(session.steps(), 2);
    }

    #[test]
    fn test_wave_marks_session_dirty() {
        let mut session = session();
        session.step_with(initial(5, 5, 10.0), 0.02).unwrap();
        assert_eq!(session.apply_wave(2, 2).unwrap(), 25);

        let frame = session.step(0.02).unwrap();
        assert!(frame.heights.iter().any(|&h| h != 10.0));
    }

    #[test]
    fn test_wave_before_initialization_fails() {
        let mut session = session();
        assert_eq!(session.apply_wave(0, 0), Err(SurfaceError::NotInitialized));
        assert_eq!(session.set_active_mask(None), Err(SurfaceError::NotInitialized));
    }

    #[test]
    fn test_advance_frame_runs_calls_scale_steps() {
        let mut config = SurfaceConfig::default();
        config.timing.calls_scale = 3;
        let mut session = SurfaceSession::new(config).unwrap();
        session
            .initialize(HeightField::flat(GridDims::new(4, 4).unwrap(), 2.0))
            .unwrap();
        assert_eq!(session.advance_frame(1.0 / 60.0).unwrap(), 3);
        assert_eq!(session.steps(), 3);
    }

    #[test]
    fn test_failed_step_poisons_session() {
        let mut session = SurfaceSession::with_stepper(
            SurfaceConfig::default(),
            Box::new(BrokenStepper { seeded: false }),
        );
        session
            .initialize(HeightField::flat(GridDims::new(4, 4).unwrap(), 1.0))
            .unwrap();

        assert!(matches!(
            session.step(0.02),
            Err(SurfaceError::CapacityExceeded { .. })
        ));
        assert!(session.is_poisoned());
        assert_eq!(session.step(0.02).err(), Some(SurfaceError::SessionPoisoned));
        assert_eq!(session.apply_wave(1, 1), Err(SurfaceError::SessionPoisoned));
        assert_eq!(session.reseed(), Err(SurfaceError::SessionPoisoned));
        // Configuration stays adjustable.
        session.set_fluidity_factor(5.0);
        assert_eq!(session.params().fluidity_factor, 5.0);
    }

    #[test]
    fn test_parameter_setters_apply_to_next_step() {
        let mut session = session();
        session.step_with(initial(3, 3, 0.0), 0.02).unwrap();
        session.set_damping_factor(0.5);
        session.set_wave_strength(4.0);
        session.set_wave_radius(1.0);
        assert_eq!(session.params().damping_factor, 0.5);

        session.apply_wave(1, 1).unwrap();
        assert_eq!(session.field().unwrap().height_at(1, 1), 4.0);
        assert_eq!(session.field().unwrap().height_at(0, 1), 0.0);
    }

    #[test]
    fn test_release_then_step_reseeds() {
        let config = SurfaceConfig {
            backend: BackendKind::Batched,
            batch: BatchConfig {
                strip_count: 2,
                max_batch_rows: 4,
            },
            ..Default::default()
        };
        let mut session = SurfaceSession::new(config).unwrap();
        session.step_with(initial(4, 10, 3.0), 0.02).unwrap();
        session.release();
        let frame = session.step(0.02).unwrap();
        assert!(frame.heights.iter().all(|&h| h == 3.0));
        assert_eq!(session.backend(), BackendKind::Batched);
    }

    #[test]
    fn test_snapshot_restore_continues_counting() {
        let mut session = session();
        session.step_with(initial(4, 4, 1.0), 0.02).unwrap();
        session.apply_wave(1, 1).unwrap();
        session.step(0.02).unwrap();

        let snapshot = session.snapshot().unwrap();
        let restored = SurfaceSession::restore(SurfaceConfig::default(), snapshot).unwrap();
        assert_eq!(restored.steps(), 2);
        assert_eq!(restored.field(), session.field());
    }
}
