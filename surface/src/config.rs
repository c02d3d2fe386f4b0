//! Tunable knobs for the surface simulation.
//!
//! All of these are plain serializable values. Parameter changes made between
//! steps take effect on the next step only.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{SurfaceError, SurfaceResult};

/// Scalar parameters read by the stepping rule and the wave injector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Gain pulling a cell's velocity toward its neighbor average.
    pub fluidity_factor: f32,
    /// Multiplicative velocity decay applied every step (a.k.a. absorb factor).
    pub damping_factor: f32,
    /// Peak height added at the center of an injected wave.
    pub wave_strength: f32,
    /// Radius of the raised-cosine window, in cells.
    pub wave_radius: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            fluidity_factor: DEFAULT_FLUIDITY_FACTOR,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            wave_strength: DEFAULT_WAVE_STRENGTH,
            wave_radius: DEFAULT_WAVE_RADIUS,
        }
    }
}

/// Which stepper implementation a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Whole grid evaluated in a single double-buffered pass.
    #[default]
    Direct,
    /// Strips dispatched through a fixed-capacity arena and stitched back.
    Batched,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "cpu" => Ok(BackendKind::Direct),
            "batched" | "accelerated" | "gpu" => Ok(BackendKind::Batched),
            other => Err(format!("unknown backend '{other}', expected direct or batched")),
        }
    }
}

/// Striping limits for the batched backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of strips a tall grid is nominally split into.
    pub strip_count: usize,
    /// Largest number of rows a single dispatch may cover.
    pub max_batch_rows: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            strip_count: DEFAULT_STRIP_COUNT,
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> SurfaceResult<()> {
        if self.strip_count == 0 {
            return Err(SurfaceError::InvalidBatchConfig(
                "strip_count must be at least 1".to_string(),
            ));
        }
        if self.max_batch_rows < MIN_STRIP_ROWS {
            return Err(SurfaceError::InvalidBatchConfig(format!(
                "max_batch_rows must be at least {MIN_STRIP_ROWS}, got {}",
                self.max_batch_rows
            )));
        }
        Ok(())
    }
}

/// How simulated time maps onto rendered frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTiming {
    /// Multiplier applied to the fixed frame delta before each step.
    pub time_scale: f32,
    /// Number of steps run per frame.
    pub calls_scale: u32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            calls_scale: 1,
        }
    }
}

/// Everything needed to build a `SurfaceSession`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub backend: BackendKind,
    pub batch: BatchConfig,
    pub params: SimulationParameters,
    pub timing: FrameTiming,
}
