//! Random wave hits at a configured mean rate.

use bevy::prelude::*;
use bevy_ecs::event::EventWriter;
use bevy_ecs::system::{Res, ResMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RainConfig;
use crate::plugin::{SurfaceMapping, WaveHitEvent};

#[derive(Resource, Debug)]
pub struct RainState {
    rng: StdRng,
    drops_per_second: f32,
    /// Fractional drops carried over between ticks.
    pending: f32,
}

impl RainState {
    pub fn new(config: &RainConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            drops_per_second: config.drops_per_second.max(0.0),
            pending: 0.0,
        }
    }

    /// Number of drops falling during a tick of `dt` seconds.
    pub fn drops_for(&mut self, dt: f32) -> u32 {
        self.pending += self.drops_per_second * dt;
        let drops = self.pending.floor();
        self.pending -= drops;
        drops as u32
    }

    /// Uniform point on the surface square. A degenerate square yields the
    /// origin.
    pub fn random_point(&mut self, real_size: f32) -> Vec3 {
        if !(real_size > 0.0) || !real_size.is_finite() {
            return Vec3::ZERO;
        }
        Vec3::new(
            self.rng.gen_range(0.0..real_size),
            0.0,
            self.rng.gen_range(0.0..real_size),
        )
    }
}

pub fn rain_system(
    mut rain: ResMut<RainState>,
    mapping: Res<SurfaceMapping>,
    time: Res<Time<Fixed>>,
    mut hits: EventWriter<WaveHitEvent>,
) {
    let drops = rain.drops_for(time.delta_secs());
    for _ in 0..drops {
        let point = rain.random_point(mapping.0.real_size());
        log::debug!("Rain drop at {:?}", point);
        hits.write(WaveHitEvent { point });
    }
}
