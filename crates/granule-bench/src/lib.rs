//! Benchmark profiles for the granule building blocks.
//!
//! - [`reference_world`]: 128x128 world with 10K uniformly spread particles
//! - [`stress_world`]: 512x512 world with 100K particles
//! - [`crowded_world`]: 10K particles packed into a few cells, to exercise
//!   bucket overflow

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use granule_engine::{ParticleWorld, WorldConfig};
use granule_pool::PoolConfig;
use granule_test_utils::{spawn_clustered, spawn_uniform, Particle};

/// Step size used by the bench update closure.
pub const DT: f32 = 0.1;

fn populated(width: u32, height: u32, particles: Vec<Particle>) -> ParticleWorld<Particle> {
    let config = WorldConfig {
        pool: PoolConfig::default(),
        ..WorldConfig::new(width, height)
    };
    let mut world = ParticleWorld::new(config).expect("bench profile config is valid");
    for p in particles {
        world.spawn(p);
    }
    world
}

/// 128x128 world holding 10K particles spread uniformly.
pub fn reference_world(seed: u64) -> ParticleWorld<Particle> {
    populated(128, 128, spawn_uniform(seed, 10_000, 128.0, 128.0))
}

/// 512x512 world holding 100K particles spread uniformly.
pub fn stress_world(seed: u64) -> ParticleWorld<Particle> {
    populated(512, 512, spawn_uniform(seed, 100_000, 512.0, 512.0))
}

/// 128x128 world with 10K particles split over 16 cells, so nearly every
/// insert hits a full bucket.
pub fn crowded_world(seed: u64) -> ParticleWorld<Particle> {
    let particles = (0..16u32)
        .flat_map(|i| spawn_clustered(seed + u64::from(i), 625, 8 + i * 7, 64))
        .collect();
    populated(128, 128, particles)
}

/// Bounce particles off the world edges, then advance them.
pub fn drift(width: f32, height: f32) -> impl Fn(&mut Particle) + Sync {
    move |p| {
        let [x, y] = p.position;
        if !(0.0..width).contains(&x) {
            p.velocity[0] = -p.velocity[0];
        }
        if !(0.0..height).contains(&y) {
            p.velocity[1] = -p.velocity[1];
        }
        p.advance(DT);
    }
}
