//! Particle fixtures and seeded spawners.

use granule_space::Positioned;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A point mass with a velocity, positioned in grid units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl Particle {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: [x, y],
            velocity: [0.0, 0.0],
        }
    }

    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.velocity = [vx, vy];
        self
    }

    /// Explicit Euler step.
    pub fn advance(&mut self, dt: f32) {
        self.position[0] += self.velocity[0] * dt;
        self.position[1] += self.velocity[1] * dt;
    }
}

impl Positioned for Particle {
    fn position(&self) -> [f32; 2] {
        self.position
    }
}

/// Uniform sample in `[0, 1)`.
fn unit(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

/// `count` particles spread uniformly over `[0, width) x [0, height)`,
/// with small random velocities.
pub fn spawn_uniform(seed: u64, count: usize, width: f32, height: f32) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = unit(&mut rng) * width;
            let y = unit(&mut rng) * height;
            let vx = unit(&mut rng) - 0.5;
            let vy = unit(&mut rng) - 0.5;
            Particle::at(x, y).with_velocity(vx, vy)
        })
        .collect()
}

/// `count` particles packed inside the unit cell at `(cx, cy)`. Useful for
/// driving buckets past capacity.
pub fn spawn_clustered(seed: u64, count: usize, cx: u32, cy: u32) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = cx as f32 + unit(&mut rng) * 0.99;
            let y = cy as f32 + unit(&mut rng) * 0.99;
            Particle::at(x, y)
        })
        .collect()
}
