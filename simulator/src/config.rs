use bevy_log::info;
use ron::de::from_str;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use surface::{BackendKind, SurfaceConfig};

pub const DEFAULT_GRID_SIZE: usize = 512;
pub const DEFAULT_REAL_SIZE: f32 = 100.0;
pub const DEFAULT_INITIAL_LEVEL: f32 = 15.0;
pub const DEFAULT_TICKS_PER_SECOND: f64 = 60.0;
pub const DEFAULT_STATS_INTERVAL_TICKS: u64 = 120;
pub const MIN_GRID_SIZE: usize = 2;

/// Random wave hits standing in for interactive input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RainConfig {
    /// Mean number of drops per simulated second.
    pub drops_per_second: f32,
    /// Fixed seed for reproducible runs. Random when absent.
    pub seed: Option<u64>,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            drops_per_second: 4.0,
            seed: None,
        }
    }
}

/// Everything the headless simulator reads at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Cells per side of the square grid.
    pub grid_size: usize,
    /// World-space side length covered by the grid.
    pub real_size: f32,
    /// Level the still surface starts at.
    pub initial_level: f32,
    pub ticks_per_second: f64,
    /// Stop after this many ticks. Runs until interrupted when absent.
    pub max_ticks: Option<u64>,
    /// Log surface statistics every this many ticks (0 disables).
    pub stats_interval_ticks: u64,
    pub rain: Option<RainConfig>,
    /// Restored from at startup when present, written on exit.
    pub snapshot_path: Option<PathBuf>,
    pub surface: SurfaceConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            real_size: DEFAULT_REAL_SIZE,
            initial_level: DEFAULT_INITIAL_LEVEL,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            max_ticks: None,
            stats_interval_ticks: DEFAULT_STATS_INTERVAL_TICKS,
            rain: Some(RainConfig::default()),
            snapshot_path: None,
            surface: SurfaceConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Rejects settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_size < MIN_GRID_SIZE {
            return Err(format!(
                "grid_size must be at least {MIN_GRID_SIZE}, got {}",
                self.grid_size
            ));
        }
        if !(self.real_size > 0.0) || !self.real_size.is_finite() {
            return Err(format!("real_size must be positive, got {}", self.real_size));
        }
        if !(self.ticks_per_second > 0.0) {
            return Err(format!(
                "ticks_per_second must be positive, got {}",
                self.ticks_per_second
            ));
        }
        Ok(())
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub max_ticks: Option<u64>,
    pub grid_size: Option<usize>,
    pub backend: Option<BackendKind>,
    pub seed: Option<u64>,
    pub snapshot_path: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, config: &mut SimulatorConfig) {
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = Some(max_ticks);
        }
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(backend) = self.backend {
            config.surface.backend = backend;
        }
        if let Some(seed) = self.seed {
            if let Some(rain) = config.rain.as_mut() {
                rain.seed = Some(seed);
            }
        }
        if let Some(path) = self.snapshot_path {
            config.snapshot_path = Some(path);
        }
    }
}

pub fn load_config(path: &Path) -> Result<SimulatorConfig, Box<dyn std::error::Error>> {
    if !path.exists() {
        info!(
            "Simulator config not found: {}. Using default settings.",
            path.display()
        );
        return Ok(SimulatorConfig::default());
    }

    let contents: String = fs::read_to_string(path)?;
    let config: SimulatorConfig = from_str(&contents)?;

    info!("Found simulator config file from disk: {}", path.display());

    Ok(config)
}

pub fn save_config(
    config: &SimulatorConfig,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let pretty_config = PrettyConfig::new()
        .with_depth_limit(3)
        .with_separate_tuple_members(true)
        .with_enumerate_arrays(true);

    let serialized = ron::ser::to_string_pretty(config, pretty_config)?;
    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    info!("Simulator config saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.ron", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/definitely/not/here.ron")).unwrap();
        assert_eq!(config, SimulatorConfig::default());
    }

    #[test]
    fn test_saved_config_loads_back() {
        let path = temp_path("simulator-config");
        let mut config = SimulatorConfig {
            grid_size: 64,
            max_ticks: Some(300),
            snapshot_path: Some(PathBuf::from("surface.snap")),
            ..Default::default()
        };
        config.surface.backend = BackendKind::Batched;
        config.surface.params.damping_factor = 0.99;

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_path("simulator-partial");
        fs::write(&path, "(grid_size: 32, rain: None)").unwrap();
        let loaded = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.grid_size, 32);
        assert_eq!(loaded.rain, None);
        assert_eq!(loaded.initial_level, DEFAULT_INITIAL_LEVEL);
        assert_eq!(loaded.surface, SurfaceConfig::default());
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        assert!(SimulatorConfig::default().validate().is_ok());

        let bad = [
            SimulatorConfig {
                real_size: 0.0,
                ..Default::default()
            },
            SimulatorConfig {
                real_size: -5.0,
                ..Default::default()
            },
            SimulatorConfig {
                real_size: f32::NAN,
                ..Default::default()
            },
            SimulatorConfig {
                grid_size: 1,
                ..Default::default()
            },
            SimulatorConfig {
                ticks_per_second: 0.0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "accepted {config:?}");
        }
    }

    #[test]
    fn test_zero_real_size_in_file_is_rejected() {
        let path = temp_path("simulator-zero-size");
        fs::write(&path, "(real_size: 0.0)").unwrap();
        let loaded = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(loaded.validate().unwrap_err().contains("real_size"));
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config = SimulatorConfig::default();
        Overrides {
            max_ticks: Some(10),
            grid_size: Some(48),
            backend: Some(BackendKind::Batched),
            seed: Some(7),
            snapshot_path: None,
        }
        .apply(&mut config);

        assert_eq!(config.max_ticks, Some(10));
        assert_eq!(config.grid_size, 48);
        assert_eq!(config.surface.backend, BackendKind::Batched);
        assert_eq!(config.rain.as_ref().and_then(|rain| rain.seed), Some(7));
        assert_eq!(config.snapshot_path, None);
    }
}
