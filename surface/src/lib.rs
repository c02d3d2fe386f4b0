//! Height-field water surface simulation.
//!
//! The crate advances a grid of water heights with a neighbor-averaging spring
//! rule, injects localized waves, reconstructs per-vertex normals and, for tall
//! grids, splits each step into overlapping strips dispatched in parallel.
//! `SurfaceSession` ties these together behind a single stateful handle.

pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod mapping;
pub mod neighbor;
pub mod normals;
pub mod session;
pub mod snapshot;
pub mod stepper;
pub mod wave;

pub use config::{BackendKind, BatchConfig, FrameTiming, SimulationParameters, SurfaceConfig};
pub use error::{SurfaceError, SurfaceResult};
pub use field::{GridDims, HeightField, SurfaceStats};
pub use mapping::GridMapping;
pub use session::{StepRequest, SurfaceFrame, SurfaceSession};
pub use snapshot::SurfaceSnapshot;
pub use stepper::{make_stepper, BatchedStepper, DirectStepper, StepView, StripPlan, SurfaceStepper};
pub use wave::WaveInjector;
