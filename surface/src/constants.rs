/// Smallest allowed grid side, in cells.
pub const MIN_GRID_SIDE: usize = 2;

/// Diagonal neighbors sit √2 further away than axis neighbors; their deviation
/// from the center is divided by this before averaging.
pub const DIAGONAL_ATTENUATION: f32 = std::f32::consts::SQRT_2;

/// A strip window needs at least one kept row between its two discarded edges.
pub const MIN_STRIP_ROWS: usize = 3;

/// Rows shared by two consecutive strip windows.
pub const STRIP_OVERLAP_ROWS: usize = 2;

pub const DEFAULT_FLUIDITY_FACTOR: f32 = 20.0;
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.995;
pub const DEFAULT_WAVE_STRENGTH: f32 = 2.0;
pub const DEFAULT_WAVE_RADIUS: f32 = 4.0;

pub const DEFAULT_STRIP_COUNT: usize = 4;
pub const DEFAULT_MAX_BATCH_ROWS: usize = 256;
