use crate::config::SimulatorConfig;
use crate::plugin::{SimulationClock, SnapshotTarget, SurfaceMapping, SurfacePlugin};
use crate::rain::RainState;
use bevy::prelude::*;
use bevy_app::ScheduleRunnerPlugin;
use bevy_log::{error, info, LogPlugin};
use std::time::Duration;
use surface::{
    GridDims, GridMapping, HeightField, SurfaceResult, SurfaceSession, SurfaceSnapshot,
};

/// Builds the session: from the snapshot file when one exists, otherwise a
/// still surface at the configured level.
pub fn build_session(config: &SimulatorConfig) -> Result<SurfaceSession, Box<dyn std::error::Error>> {
    if let Some(path) = config.snapshot_path.as_deref().filter(|path| path.exists()) {
        let snapshot = SurfaceSnapshot::load(path)?;
        info!(
            "Restoring surface from {} at step {}",
            path.display(),
            snapshot.steps
        );
        return Ok(SurfaceSession::restore(config.surface, snapshot)?);
    }

    let dims = GridDims::new(config.grid_size, config.grid_size)?;
    let mut session = SurfaceSession::new(config.surface)?;
    session.initialize(HeightField::flat(dims, config.initial_level))?;
    Ok(session)
}

/// Inserts the session and its companion resources into `app`.
pub fn setup_surface(
    app: &mut App,
    config: &SimulatorConfig,
    session: SurfaceSession,
) -> SurfaceResult<()> {
    let dims = match session.dims() {
        Some(dims) => dims,
        None => GridDims::new(config.grid_size, config.grid_size)?,
    };

    app.insert_resource(SurfaceMapping(GridMapping::new(dims, config.real_size)));
    app.insert_resource(SimulationClock {
        ticks: 0,
        max_ticks: config.max_ticks,
        stats_interval_ticks: config.stats_interval_ticks,
    });
    app.insert_resource(SnapshotTarget(config.snapshot_path.clone()));
    if let Some(rain) = &config.rain {
        app.insert_resource(RainState::new(rain));
    }
    app.insert_resource(session);
    app.add_plugins(SurfacePlugin);
    Ok(())
}

pub fn init(config: SimulatorConfig) {
    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / config.ticks_per_second,
        ))),
    );
    app.add_plugins(LogPlugin::default());
    app.insert_resource(Time::<Fixed>::from_hz(config.ticks_per_second));

    let session = match build_session(&config) {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to set up the surface: {}", err);
            std::process::exit(1);
        }
    };

    info!(
        "Starting simulator: {}x{} grid, {:?} backend, {} ticks per second",
        config.grid_size, config.grid_size, session.backend(), config.ticks_per_second
    );

    if let Err(err) = setup_surface(&mut app, &config, session) {
        error!("Failed to set up the surface: {}", err);
        std::process::exit(1);
    }

    app.run();
}
