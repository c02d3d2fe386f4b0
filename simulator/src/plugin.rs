//! Bevy plugin driving a `SurfaceSession` on the fixed tick.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use bevy_ecs::event::{EventReader, EventWriter};
use bevy_ecs::system::{Res, ResMut};
use bevy_log::{error, info, warn};
use surface::{GridMapping, SurfaceSession};

use crate::rain::{rain_system, RainState};

/// A point on (or above) the surface that was hit, in world space.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct WaveHitEvent {
    pub point: Vec3,
}

/// World-to-grid conversion of the running surface.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SurfaceMapping(pub GridMapping);

/// Tick bookkeeping of the simulator.
#[derive(Resource, Debug, Clone, Default)]
pub struct SimulationClock {
    pub ticks: u64,
    pub max_ticks: Option<u64>,
    pub stats_interval_ticks: u64,
}

/// Where the surface is written when the run ends.
#[derive(Resource, Debug, Clone, Default)]
pub struct SnapshotTarget(pub Option<PathBuf>);

/// Plugin that steps the water surface.
///
/// This plugin:
/// - Turns `WaveHitEvent`s into waves on the surface
/// - Optionally rains random hits when a `RainState` resource exists
/// - Advances the session once per fixed tick
/// - Logs surface statistics periodically
/// - Exits (saving a snapshot if configured) when the tick limit is reached
///
/// `SurfaceSession` and `SurfaceMapping` must be inserted by the caller.
pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WaveHitEvent>()
            .init_resource::<SimulationClock>()
            .init_resource::<SnapshotTarget>()
            .add_systems(
                FixedUpdate,
                (
                    rain_system.run_if(resource_exists::<RainState>),
                    apply_wave_hits,
                    step_surface,
                    log_surface_stats,
                    stop_at_tick_limit,
                )
                    .chain(),
            );
    }
}

pub fn apply_wave_hits(
    mut session: ResMut<SurfaceSession>,
    mapping: Res<SurfaceMapping>,
    mut hits: EventReader<WaveHitEvent>,
) {
    for hit in hits.read() {
        let (row, col) = mapping.0.point_to_cell(hit.point);
        if let Err(err) = session.apply_wave(row, col) {
            warn!("Could not apply wave at {:?}: {}", hit.point, err);
        }
    }
}

/// Advances the surface by one frame of fixed time.
pub fn step_surface(
    mut session: ResMut<SurfaceSession>,
    mut clock: ResMut<SimulationClock>,
    time: Res<Time<Fixed>>,
    mut exit: EventWriter<AppExit>,
) {
    if session.is_poisoned() {
        return;
    }

    match session.advance_frame(time.delta_secs()) {
        Ok(_) => clock.ticks += 1,
        Err(err) => {
            error!("Surface simulation failed at tick {}: {}", clock.ticks, err);
            exit.write(AppExit::error());
        }
    }
}

pub fn log_surface_stats(session: Res<SurfaceSession>, clock: Res<SimulationClock>) {
    if clock.stats_interval_ticks == 0 || clock.ticks == 0 {
        return;
    }
    if clock.ticks % clock.stats_interval_ticks != 0 {
        return;
    }
    if let Some(stats) = session.stats() {
        info!(
            "tick {} | energy {:.5} | mean {:.3} | min {:.3} | max {:.3}",
            clock.ticks, stats.kinetic_energy, stats.mean_height, stats.min_height, stats.max_height
        );
    }
}

pub fn stop_at_tick_limit(
    session: Res<SurfaceSession>,
    clock: Res<SimulationClock>,
    target: Res<SnapshotTarget>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(max_ticks) = clock.max_ticks else {
        return;
    };
    if clock.ticks < max_ticks {
        return;
    }

    if let Some(path) = &target.0 {
        save_snapshot(&session, path);
    }
    info!("Reached {} ticks, stopping", clock.ticks);
    exit.write(AppExit::Success);
}

pub fn save_snapshot(session: &SurfaceSession, path: &Path) {
    let saved = session.snapshot().and_then(|snapshot| snapshot.save(path));
    if let Err(err) = saved {
        error!("Failed to save surface snapshot to {}: {}", path.display(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use surface::{GridDims, HeightField, SurfaceConfig};

    fn app(max_ticks: Option<u64>) -> App {
        let dims = GridDims::new(16, 16).unwrap();
        let mut session = SurfaceSession::new(SurfaceConfig::default()).unwrap();
        session.initialize(HeightField::flat(dims, 15.0)).unwrap();

        let mut app = App::new();
        app.add_plugins(SurfacePlugin);
        app.insert_resource(session);
        app.insert_resource(SurfaceMapping(GridMapping::new(dims, 8.0)));
        app.insert_resource(SimulationClock {
            ticks: 0,
            max_ticks,
            stats_interval_ticks: 1,
        });

        let mut time = Time::<Fixed>::from_hz(50.0);
        time.advance_by(Duration::from_millis(20));
        app.insert_resource(time);
        app
    }

    #[test]
    fn test_wave_hit_disturbs_surface() {
        let mut app = app(None);
        app.world_mut().send_event(WaveHitEvent {
            point: Vec3::new(4.0, 0.0, 4.0),
        });
        app.world_mut().run_schedule(FixedUpdate);

        let session = app.world().resource::<SurfaceSession>();
        assert_eq!(session.steps(), 1);
        let field = session.field().unwrap();
        assert!(field.height_at(8, 8) > 15.0);
        assert_eq!(app.world().resource::<SimulationClock>().ticks, 1);
    }

    #[test]
    fn test_missed_hit_leaves_surface_flat() {
        let mut app = app(None);
        app.world_mut().send_event(WaveHitEvent {
            point: Vec3::new(-50.0, 0.0, 200.0),
        });
        app.world_mut().run_schedule(FixedUpdate);

        let session = app.world().resource::<SurfaceSession>();
        assert!(session.field().unwrap().heights().iter().all(|&h| h == 15.0));
    }

    #[test]
    fn test_hit_far_outside_the_world_is_ignored() {
        let mut app = app(None);
        app.world_mut().send_event(WaveHitEvent {
            point: Vec3::new(1.0e30, 0.0, -1.0e30),
        });
        app.world_mut().run_schedule(FixedUpdate);

        let session = app.world().resource::<SurfaceSession>();
        assert!(!session.is_poisoned());
        assert!(session.field().unwrap().heights().iter().all(|&h| h == 15.0));
    }

    #[test]
    fn test_tick_limit_requests_exit() {
        let mut app = app(Some(2));
        app.world_mut().run_schedule(FixedUpdate);
        assert!(app.world().resource::<Events<AppExit>>().is_empty());

        app.world_mut().run_schedule(FixedUpdate);
        assert!(!app.world().resource::<Events<AppExit>>().is_empty());
    }
}
